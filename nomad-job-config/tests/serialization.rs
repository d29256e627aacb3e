use maplit::hashmap;
use nomad_job_config::*;
use pretty_assertions::assert_eq;
use serde_json::json;

#[test]
fn job_serializes_with_nomad_field_names() {
	let mut group = TaskGroup {
		network: Some(Network {
			mode: "bridge".to_string(),
			ports: [(
				"port_0".to_string(),
				Port {
					static_: Some(80),
					to: Some(80),
					host_network: None,
				},
			)]
			.into_iter()
			.collect(),
		}),
		..Default::default()
	};

	let mut task = Task::default();
	task
		.config
		.insert("image".to_string(), json!("nginx:alpine"));
	group.tasks.insert("web".to_string(), task);

	let mut job = Job::new("web");
	job.groups.insert("web".to_string(), group);

	let value = serde_json::to_value(&job).unwrap();

	assert_eq!(value["type"], "service");
	assert_eq!(value["groups"]["web"]["count"], 1);
	assert_eq!(
		value["groups"]["web"]["network"]["ports"]["port_0"],
		json!({ "static": 80, "to": 80 })
	);
	assert_eq!(
		value["groups"]["web"]["tasks"]["web"]["resources"],
		json!({ "cpu": 100, "memory": 128 })
	);

	// Empty collections are left out
	assert!(value.get("constraints").is_none());
	assert!(value["groups"]["web"].get("volumes").is_none());
}

#[test]
fn jobs_read_back_from_json() {
	let job: Job = serde_json::from_value(json!({
		"id": "shop",
		"type": "batch",
		"meta": { "team": "platform" },
		"groups": {
			"worker": {
				"count": 2,
				"restart": { "attempts": 0, "mode": "fail" },
				"tasks": {
					"worker": { "config": { "image": "busybox" } }
				}
			}
		}
	}))
	.unwrap();

	assert_eq!(job.type_, JobType::Batch);
	assert_eq!(job.region, "global");

	let meta: std::collections::HashMap<_, _> = job.meta.clone().into_iter().collect();
	assert_eq!(
		meta,
		hashmap! { "team".to_string() => "platform".to_string() }
	);

	let group = job.group("worker").unwrap();
	let restart = group.restart.as_ref().unwrap();

	assert_eq!(group.count, 2);
	assert_eq!(restart.attempts, 0);
	assert_eq!(restart.mode, RestartMode::Fail);
	assert_eq!(restart.delay, "15s");

	let (group_name, task_name, task) = job.tasks().next().unwrap();

	assert_eq!((group_name, task_name), ("worker", "worker"));
	assert_eq!(task.driver, DOCKER_DRIVER);
	assert_eq!(task.image(), Some("busybox"));
}
