use std::{
	fmt::{self, Display},
	str::FromStr,
};

use indexmap::IndexMap;
#[cfg(feature = "schemars")]
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

mod group;
mod task;

pub use group::*;
pub use task::*;

/// The top level of a Nomad job specification.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/job
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Job {
	/// The identifier of the job, used as the label of the `job` block.
	pub id: String,

	/// A display name for the job. Defaults to the id.
	pub name: String,

	#[serde(rename = "type")]
	pub type_: JobType,

	/// The job priority, between 1 and 100.
	pub priority: u8,

	pub region: String,

	pub namespace: String,

	/// The datacenters in the region which are eligible for task placement.
	pub datacenters: Vec<String>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub constraints: Vec<Constraint>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub affinities: Vec<Affinity>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub spreads: Vec<Spread>,

	/// The rolling update strategy applied to every group.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub update: Option<UpdateStrategy>,

	#[serde(skip_serializing_if = "IndexMap::is_empty")]
	pub meta: IndexMap<String, String>,

	/// The task groups, keyed by name, in insertion order.
	pub groups: IndexMap<String, TaskGroup>,
}

impl Default for Job {
	fn default() -> Self {
		Self {
			id: String::new(),
			name: String::new(),
			type_: JobType::default(),
			priority: 50,
			region: "global".to_string(),
			namespace: "default".to_string(),
			datacenters: vec!["dc1".to_string()],
			constraints: vec![],
			affinities: vec![],
			spreads: vec![],
			update: None,
			meta: IndexMap::new(),
			groups: IndexMap::new(),
		}
	}
}

impl Job {
	/// Creates an empty job with the given id, which doubles as its name.
	pub fn new(id: impl Into<String>) -> Self {
		let id = id.into();

		Self {
			name: id.clone(),
			id,
			..Default::default()
		}
	}

	/// A job without groups, such as the one produced by an aborted conversion.
	pub fn is_empty(&self) -> bool {
		self.groups.is_empty()
	}

	pub fn group(&self, name: &str) -> Option<&TaskGroup> {
		self.groups.get(name)
	}

	/// Iterates every task of every group, along with the name of its group.
	pub fn tasks(&self) -> impl Iterator<Item = (&str, &str, &Task)> {
		self.groups.iter().flat_map(|(group_name, group)| {
			group
				.tasks
				.iter()
				.map(move |(task_name, task)| (group_name.as_str(), task_name.as_str(), task))
		})
	}
}

/// The scheduler used for a job.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(rename_all = "lowercase")]
pub enum JobType {
	/// Long-lived services that should never go down.
	#[default]
	Service,
	/// Short-lived tasks that run to completion.
	Batch,
	/// One instance per eligible client node.
	System,
	Sysbatch,
}

impl JobType {
	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Service => "service",
			Self::Batch => "batch",
			Self::System => "system",
			Self::Sysbatch => "sysbatch",
		}
	}
}

impl Display for JobType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for JobType {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.to_lowercase().as_str() {
			"service" => Ok(Self::Service),
			"batch" => Ok(Self::Batch),
			"system" => Ok(Self::System),
			"sysbatch" => Ok(Self::Sysbatch),
			other => Err(format!(
				"unknown job type `{other}` (expected service, batch, system or sysbatch)"
			)),
		}
	}
}

/// Rolling update settings.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/update
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct UpdateStrategy {
	/// The delay between each set of updates.
	pub stagger: String,

	/// The number of allocations within a task group that can be updated at the same time.
	pub max_parallel: u32,
}

impl Default for UpdateStrategy {
	fn default() -> Self {
		Self {
			stagger: "10s".to_string(),
			max_parallel: 2,
		}
	}
}

/// The operators accepted by `constraint` and `affinity` blocks.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub enum Operator {
	#[default]
	#[serde(rename = "=")]
	Eq,
	#[serde(rename = "!=")]
	NotEq,
	#[serde(rename = ">")]
	Gt,
	#[serde(rename = ">=")]
	Gte,
	#[serde(rename = "<")]
	Lt,
	#[serde(rename = "<=")]
	Lte,
	#[serde(rename = "distinct_hosts")]
	DistinctHosts,
	#[serde(rename = "distinct_property")]
	DistinctProperty,
	#[serde(rename = "regexp")]
	Regexp,
	#[serde(rename = "set_contains")]
	SetContains,
	#[serde(rename = "set_contains_all")]
	SetContainsAll,
	#[serde(rename = "set_contains_any")]
	SetContainsAny,
	#[serde(rename = "version")]
	Version,
	#[serde(rename = "semver")]
	Semver,
	#[serde(rename = "is_set")]
	IsSet,
	#[serde(rename = "is_not_set")]
	IsNotSet,
}

impl Operator {
	pub const ALL: [Self; 16] = [
		Self::Eq,
		Self::NotEq,
		Self::Gt,
		Self::Gte,
		Self::Lt,
		Self::Lte,
		Self::DistinctHosts,
		Self::DistinctProperty,
		Self::Regexp,
		Self::SetContains,
		Self::SetContainsAll,
		Self::SetContainsAny,
		Self::Version,
		Self::Semver,
		Self::IsSet,
		Self::IsNotSet,
	];

	pub const fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::NotEq => "!=",
			Self::Gt => ">",
			Self::Gte => ">=",
			Self::Lt => "<",
			Self::Lte => "<=",
			Self::DistinctHosts => "distinct_hosts",
			Self::DistinctProperty => "distinct_property",
			Self::Regexp => "regexp",
			Self::SetContains => "set_contains",
			Self::SetContainsAll => "set_contains_all",
			Self::SetContainsAny => "set_contains_any",
			Self::Version => "version",
			Self::Semver => "semver",
			Self::IsSet => "is_set",
			Self::IsNotSet => "is_not_set",
		}
	}

	/// Operators that do not compare against a value.
	pub const fn is_unary(self) -> bool {
		matches!(self, Self::IsSet | Self::IsNotSet)
	}
}

impl Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for Operator {
	type Err = String;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		// Compose placement constraints use `==`
		let s = if s == "==" { "=" } else { s };

		Self::ALL
			.into_iter()
			.find(|op| op.as_str() == s)
			.ok_or_else(|| format!("unknown constraint operator `{s}`"))
	}
}

/// Restricts the set of eligible nodes.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/constraint
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Constraint {
	#[serde(skip_serializing_if = "Option::is_none")]
	pub attribute: Option<String>,

	pub operator: Operator,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub value: Option<String>,
}

impl Constraint {
	pub fn new(attribute: impl Into<String>, operator: Operator, value: impl Into<String>) -> Self {
		Self {
			attribute: Some(attribute.into()),
			operator,
			value: Some(value.into()),
		}
	}
}

/// Expresses a placement preference, rather than a requirement.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/affinity
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Affinity {
	pub attribute: String,

	pub operator: Operator,

	pub value: String,

	/// Between -100 and 100, negative values express anti-affinity.
	pub weight: i8,
}

/// Spreads allocations over the values of a node attribute.
///
/// See more: https://developer.hashicorp.com/nomad/docs/job-specification/spread
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
#[serde(default)]
pub struct Spread {
	pub attribute: String,

	#[serde(skip_serializing_if = "Option::is_none")]
	pub weight: Option<u8>,

	#[serde(skip_serializing_if = "Vec::is_empty")]
	pub targets: Vec<SpreadTarget>,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq, Eq, Default)]
#[cfg_attr(feature = "schemars", derive(JsonSchema))]
pub struct SpreadTarget {
	pub value: String,
	pub percent: u8,
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn operators_parse_from_their_nomad_names() {
		for op in Operator::ALL {
			assert_eq!(op.as_str().parse::<Operator>().unwrap(), op);
		}

		assert_eq!("==".parse::<Operator>().unwrap(), Operator::Eq);
		assert!("~=".parse::<Operator>().is_err());
	}

	#[test]
	fn job_defaults() {
		let job = Job::new("web");

		assert_eq!(job.name, "web");
		assert_eq!(job.priority, 50);
		assert_eq!(job.datacenters, vec!["dc1".to_string()]);
		assert!(job.is_empty());
	}
}
