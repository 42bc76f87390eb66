use alloc::sync::Arc;
use alloc::vec::Vec;

use nxabi::{ProcessId, ServiceName};

use super::service::Service;

/// Maps service names and owning processes to services. Registration
/// order is preserved; lookups are linear scans returning the first match.
#[derive(Debug)]
pub struct Registry {
    services: Vec<Arc<Service>>,
}
impl Registry {
    pub fn new() -> Self {
        Self {
            services: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.services.len()
    }

    pub fn insert(&mut self, service: Arc<Service>) {
        debug_assert!(self.by_name(service.name()).is_none());
        debug_assert!(self.by_process(service.pid()).is_none());
        self.services.push(service);
    }

    pub fn by_name(&self, name: &ServiceName) -> Option<Arc<Service>> {
        self.services
            .iter()
            .find(|s| s.name() == name)
            .map(Arc::clone)
    }

    pub fn by_process(&self, pid: ProcessId) -> Option<Arc<Service>> {
        self.services
            .iter()
            .find(|s| s.pid() == pid)
            .map(Arc::clone)
    }

    pub fn remove_by_process(&mut self, pid: ProcessId) -> Option<Arc<Service>> {
        let i = self.services.iter().position(|s| s.pid() == pid)?;
        Some(self.services.remove(i))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Arc<Service>> {
        self.services.iter()
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use nxabi::VirtAddr;

    fn service(name: &str, pid: u64) -> Arc<Service> {
        Service::new(
            ServiceName::new(name).unwrap(),
            ProcessId::from_u64(pid),
            VirtAddr::new(0),
        )
    }

    #[test]
    fn test_lookups() {
        let mut registry = Registry::new();
        registry.insert(service("com.test.a", 1));
        registry.insert(service("com.test.b", 2));

        let a = ServiceName::new("com.test.a").unwrap();
        assert_eq!(registry.by_name(&a).unwrap().pid(), ProcessId::from_u64(1));
        assert_eq!(
            registry.by_process(ProcessId::from_u64(2)).unwrap().name(),
            &ServiceName::new("com.test.b").unwrap()
        );
        assert!(registry.by_process(ProcessId::from_u64(3)).is_none());

        assert!(registry.remove_by_process(ProcessId::from_u64(1)).is_some());
        assert!(registry.by_name(&a).is_none());
        assert_eq!(registry.len(), 1);
    }
}
