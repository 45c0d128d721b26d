pub mod architecture;
pub mod constraint;
pub mod id;
pub mod layout;
pub mod model;
pub mod node_id;

pub use architecture::{Architecture, ResourceMetadata, View, ViewEdge, ViewNode};
pub use constraint::{
    ApplicationConstraint, ApplicationOperator, Constraint, EdgeConstraint, EdgeOperator,
    EdgeTarget, ResourceConstraint, ResourceOperator,
};
pub use id::ElementId;
pub use layout::{LayoutDirection, LayoutOptions, LayoutResult};
pub use model::*;
pub use node_id::{InvalidIdFormat, NodeId};
