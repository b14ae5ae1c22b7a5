pub mod config;
pub mod core;
pub mod domain;
pub mod jsonapi;
pub mod utils;

pub use config::{cli::LocalStorage, ShaperConfig};

#[cfg(feature = "cli")]
pub use config::CliConfig;

pub use crate::core::group::{
    group_data_by, group_object_props_by_structure, group_objects_props,
    group_objects_props_and_head_if_single, group_objects_props_keep_only_value,
    replace_nil_prop_group_with_none, GroupLookup,
};
pub use crate::core::{etl::ShaperEngine, pipeline::ShapingPipeline};
pub use domain::model::{GroupMode, GroupStructure, Record};
pub use domain::ports::JsonApiSerializer;
pub use utils::error::{ErrorKind, ErrorStyle, FormatError, GroupError, Result, ShaperError};
