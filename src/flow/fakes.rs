// src/flow/fakes.rs - in-memory providers for flow tests

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::net::Ipv4Addr;
use std::sync::Mutex;

use crate::compute::{
    ComputeProvider, Image, Instance, Platform, SecurityGroup, SpotLaunchRequest, SpotRequest,
    SpotRequestState,
};
use crate::dns::{ChangeHandle, ChangeStatus, DnsProvider, RecordSet, Zone};
use crate::error::{Error, Result};

#[derive(Default)]
pub struct FakeCompute {
    pub instances: Mutex<Vec<(String, Instance)>>,
    pub images: Mutex<Vec<(String, Image)>>,
    pub groups: Mutex<Vec<SecurityGroup>>,
    /// group id -> (port, cidr) rules currently authorized
    pub ingress: Mutex<HashMap<String, Vec<(u16, String)>>>,
    pub spot_prices: Vec<f64>,
    /// successive states returned by `spot_request`; the last one repeats
    pub spot_states: Mutex<VecDeque<SpotRequestState>>,
    pub spot_instance_id: Option<String>,
    /// extra `image_by_id` fetches before a created image turns available
    pub image_pending_fetches: Mutex<u32>,

    pub started: Mutex<Vec<String>>,
    pub terminated: Mutex<Vec<String>>,
    pub created_images: Mutex<Vec<(String, String)>>, // (instance id, image name)
    pub name_tags: Mutex<Vec<(String, String)>>,      // (resource id, tag value)
    pub deregistered: Mutex<Vec<String>>,
    pub deleted_snapshots: Mutex<Vec<String>>,
}

impl FakeCompute {
    fn locked<T>(m: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
        m.lock().unwrap()
    }
}

#[async_trait]
impl ComputeProvider for FakeCompute {
    async fn instances_by_name_tag(&self, name: &str) -> Result<Vec<Instance>> {
        Ok(Self::locked(&self.instances)
            .iter()
            .filter(|(tag, _)| tag == name)
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn instance_by_id(&self, id: &str) -> Result<Instance> {
        Self::locked(&self.instances)
            .iter()
            .map(|(_, i)| i)
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::Api(format!("instance {id} not found")))
    }

    async fn start_instance(&self, id: &str) -> Result<()> {
        Self::locked(&self.started).push(id.to_string());
        Ok(())
    }

    async fn terminate_instance(&self, id: &str) -> Result<()> {
        Self::locked(&self.terminated).push(id.to_string());
        Ok(())
    }

    async fn images_by_name_tag(&self, name: &str) -> Result<Vec<Image>> {
        Ok(Self::locked(&self.images)
            .iter()
            .filter(|(tag, _)| tag == name)
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn image_by_id(&self, id: &str) -> Result<Image> {
        let mut image = Self::locked(&self.images)
            .iter()
            .map(|(_, i)| i)
            .find(|i| i.id == id)
            .cloned()
            .ok_or_else(|| Error::Api(format!("image {id} not found")))?;

        let mut pending = Self::locked(&self.image_pending_fetches);
        if *pending > 0 {
            *pending -= 1;
            image.state = crate::compute::ImageState::Pending;
        }
        Ok(image)
    }

    async fn instances_by_image(&self, image_id: &str) -> Result<Vec<Instance>> {
        // Name-tag slot doubles as the source image id in reimage tests.
        Ok(Self::locked(&self.instances)
            .iter()
            .filter(|(source, _)| source == image_id)
            .map(|(_, i)| i.clone())
            .collect())
    }

    async fn create_image(&self, instance_id: &str, name: &str) -> Result<String> {
        Self::locked(&self.created_images).push((instance_id.to_string(), name.to_string()));
        let id = format!("ami-new-{}", Self::locked(&self.created_images).len());
        Self::locked(&self.images).push((
            String::new(),
            Image {
                id: id.clone(),
                name: Some(name.to_string()),
                state: crate::compute::ImageState::Available,
                platform: Platform::Linux,
                snapshot_id: None,
            },
        ));
        Ok(id)
    }

    async fn deregister_image(&self, image_id: &str) -> Result<()> {
        Self::locked(&self.deregistered).push(image_id.to_string());
        Ok(())
    }

    async fn delete_snapshot(&self, snapshot_id: &str) -> Result<()> {
        Self::locked(&self.deleted_snapshots).push(snapshot_id.to_string());
        Ok(())
    }

    async fn set_name_tag(&self, resource_id: &str, name: &str) -> Result<()> {
        Self::locked(&self.name_tags).push((resource_id.to_string(), name.to_string()));
        Ok(())
    }

    async fn security_groups_by_name(&self, name: &str) -> Result<Vec<SecurityGroup>> {
        Ok(Self::locked(&self.groups)
            .iter()
            .filter(|g| g.name == name)
            .cloned()
            .collect())
    }

    async fn security_group_by_id(&self, id: &str) -> Result<SecurityGroup> {
        Self::locked(&self.groups)
            .iter()
            .find(|g| g.id == id)
            .cloned()
            .ok_or_else(|| Error::Api(format!("security group {id} not found")))
    }

    async fn clear_ingress(&self, group_id: &str) -> Result<usize> {
        Ok(Self::locked(&self.ingress)
            .get_mut(group_id)
            .map(|rules| rules.drain(..).count())
            .unwrap_or(0))
    }

    async fn authorize_ingress(&self, group_id: &str, port: u16, cidr: &str) -> Result<()> {
        Self::locked(&self.ingress)
            .entry(group_id.to_string())
            .or_default()
            .push((port, cidr.to_string()));
        Ok(())
    }

    async fn spot_prices(&self, _instance_type: &str, _platform: Platform) -> Result<Vec<f64>> {
        Ok(self.spot_prices.clone())
    }

    async fn request_spot_instance(&self, _request: &SpotLaunchRequest) -> Result<String> {
        Ok("sir-1".to_string())
    }

    async fn spot_request(&self, request_id: &str) -> Result<SpotRequest> {
        let mut states = Self::locked(&self.spot_states);
        let state = if states.len() > 1 {
            states.pop_front().unwrap()
        } else {
            states
                .front()
                .cloned()
                .unwrap_or(SpotRequestState::Other("unknown".to_string()))
        };

        let instance_id = if state == SpotRequestState::Active {
            self.spot_instance_id.clone()
        } else {
            None
        };

        Ok(SpotRequest {
            id: request_id.to_string(),
            state,
            instance_id,
        })
    }
}

#[derive(Default)]
pub struct FakeDns {
    pub zones: Vec<Zone>,
    pub existing: Option<RecordSet>,
    /// polls of `change_status` before the change reports in sync
    pub syncs_after: Mutex<u32>,
    pub upserts: Mutex<Vec<(String, String, Ipv4Addr, i64)>>,
}

#[async_trait]
impl DnsProvider for FakeDns {
    async fn list_zones(&self) -> Result<Vec<Zone>> {
        Ok(self.zones.clone())
    }

    async fn first_record_at_or_after(
        &self,
        _zone_id: &str,
        _host: &str,
    ) -> Result<Option<RecordSet>> {
        Ok(self.existing.clone())
    }

    async fn upsert_a_record(
        &self,
        zone_id: &str,
        host: &str,
        ip: Ipv4Addr,
        ttl: i64,
    ) -> Result<ChangeHandle> {
        self.upserts
            .lock()
            .unwrap()
            .push((zone_id.to_string(), host.to_string(), ip, ttl));
        Ok(ChangeHandle {
            id: "change-1".to_string(),
            status: ChangeStatus::Pending,
        })
    }

    async fn change_status(&self, _change_id: &str) -> Result<ChangeStatus> {
        let mut remaining = self.syncs_after.lock().unwrap();
        if *remaining > 0 {
            *remaining -= 1;
            Ok(ChangeStatus::Pending)
        } else {
            Ok(ChangeStatus::InSync)
        }
    }
}
