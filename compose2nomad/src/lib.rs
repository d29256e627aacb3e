#![cfg_attr(docsrs, feature(doc_auto_cfg))]
//! Translates Docker Compose files into Nomad job specifications.
//!
//! The pipeline is made of three pure steps: [`validate`] checks a parsed compose document,
//! [`convert`] turns it into a [`Job`](nomad_job_config::Job) along with its diagnostics,
//! and [`generate_hcl`] renders the job as HCL.
//!
//! ```
//! use compose2nomad::{ConvertOptions, convert_yaml};
//!
//! let result = convert_yaml(
//! 	"version: '3.8'\nservices:\n  web:\n    image: nginx:alpine\n    ports: ['80:80']\n",
//! 	&ConvertOptions::default(),
//! );
//!
//! assert!(result.is_success());
//! assert!(result.to_hcl(false).contains(r#"group "web""#));
//! ```

#[cfg(feature = "nomad-api")]
pub mod client;
pub mod cli;
pub mod converter;
pub mod errors;
pub mod fs;
pub mod hcl;
pub mod options;
pub mod units;
pub mod validator;

pub use converter::{COMPOSE_TAG, ConversionResult, NOMAD_EXTENSION, convert, convert_yaml};
pub use docker_compose_config;
pub use errors::*;
pub use hcl::{HclOptions, generate_hcl, render_errors};
pub use nomad_job_config;
pub use options::*;
pub use validator::{ValidationResult, validate};
