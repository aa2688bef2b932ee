//! Registered functional specs
//!
//! ## Cluster resources
//! - Instancetypes are well formed
//! - A VirtualMachine can be created with each cluster instancetype
//! - A VirtualMachine can be created with each cluster preference
//!
//! ## Guest boot
//! - One spec per container disk, booted with its preference

mod boot;
mod resources;

pub use boot::GuestBootSpec;
pub use resources::{
    CreateWithEachInstancetype, CreateWithEachPreference, InstancetypesWellFormed,
};

use std::sync::Arc;

use crate::config::OsDisk;
use crate::suite::Spec;

/// Every spec the suite runs, in registration order
pub fn registered() -> Vec<Arc<dyn Spec>> {
    let mut specs: Vec<Arc<dyn Spec>> = vec![
        Arc::new(InstancetypesWellFormed),
        Arc::new(CreateWithEachInstancetype),
        Arc::new(CreateWithEachPreference),
    ];
    specs.extend(
        OsDisk::all()
            .into_iter()
            .map(|os| Arc::new(GuestBootSpec::new(os)) as Arc<dyn Spec>),
    );
    specs
}
