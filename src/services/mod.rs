//! Engine services: registry, classifier, alarms, relay, topology, coordinator

pub mod alarm;
pub mod classifier;
pub mod coordinator;
pub mod registry;
pub mod relay;
pub mod topology;

pub use alarm::AlarmController;
pub use coordinator::Coordinator;
pub use registry::NodeRegistry;
pub use relay::CommunicationRelay;
pub use topology::TopologyManager;
