use docker_compose_config::*;
use maplit::hashmap;
use pretty_assertions::assert_eq;
use serde_json::Value;

const COMPOSE: &str = r#"
version: "3.8"
name: shop

services:
  web:
    image: nginx:alpine
    ports:
      - "80:80"
      - target: 443
        published: 8443
    environment:
      - MODE=prod
      - EMPTY
    depends_on:
      - api
    networks:
      - front

  api:
    build: ./api
    environment:
      DEBUG: false
      WORKERS: 4
    volumes:
      - ./src:/app/src:ro
      - api-data:/var/lib/api
    configs:
      - source: app_config
        target: /etc/app/config.yml
    secrets:
      - db_password
    deploy:
      replicas: 3
      resources:
        limits:
          cpus: "0.5"
          memory: 512M

networks:
  front:

volumes:
  api-data:

configs:
  app_config:
    file: ./config.yml

secrets:
  db_password:
    external: true

x-nomad:
  meta:
    team: platform
"#;

fn compose_file() -> ComposeFile {
	let document: Value = serde_yaml_ng::from_str(COMPOSE).unwrap();

	ComposeFile::from_value(&document).unwrap()
}

#[test]
fn top_level_sections() {
	let file = compose_file();

	assert_eq!(file.name.as_deref(), Some("shop"));
	assert_eq!(
		file.version.as_ref().map(ToString::to_string).as_deref(),
		Some("3.8")
	);

	assert!(file.has_service("web"));
	assert!(file.has_network("front"));
	assert!(file.has_config("app_config"));
	assert!(file.has_secret("db_password"));
	assert!(!file.has_secret("missing"));

	assert_eq!(
		file.config("app_config").unwrap().file.as_deref(),
		Some("./config.yml")
	);
	assert!(file.secret("db_password").unwrap().is_external());

	let extension: Value = file.extension("x-nomad").unwrap().unwrap();

	assert_eq!(extension["meta"]["team"], "platform");
}

#[test]
fn services_are_read_individually() {
	let file = compose_file();

	let services: Vec<(String, Service)> = file
		.service_definitions()
		.map(|(name, service)| (name.to_string(), service.unwrap()))
		.collect();

	let (name, web) = &services[0];
	assert_eq!(name, "web");
	assert_eq!(web.image.as_deref(), Some("nginx:alpine"));
	assert_eq!(web.declared_port_count(), 2);

	let mappings: Vec<PortMapping> = web
		.ports
		.as_ref()
		.unwrap()
		.iter()
		.map(|port| port.mapping().unwrap())
		.collect();

	assert_eq!(mappings[0].published, Some(80));
	assert_eq!(mappings[1].published, Some(8443));
	assert_eq!(mappings[1].target, 443);

	let env: std::collections::HashMap<_, _> = web
		.environment
		.as_ref()
		.unwrap()
		.to_map()
		.into_iter()
		.collect();

	assert_eq!(
		env,
		hashmap! {
			"MODE".to_string() => "prod".to_string(),
			"EMPTY".to_string() => String::new(),
		}
	);

	let (_, api) = &services[1];
	assert_eq!(api.build, Some(BuildStep::Simple("./api".to_string())));
	assert_eq!(api.deploy.as_ref().unwrap().replicas, Some(3));

	let limits = api.deploy.as_ref().unwrap().limits().unwrap();
	assert_eq!(limits.memory.as_ref().unwrap().to_string(), "512M");

	let api_env = api.environment.as_ref().unwrap().to_map();
	assert_eq!(api_env["DEBUG"], "false");
	assert_eq!(api_env["WORKERS"], "4");

	let mounts: Vec<VolumeMount> = api
		.volumes
		.as_ref()
		.unwrap()
		.iter()
		.map(|volume| volume.mount().unwrap())
		.collect();

	assert!(mounts[0].is_relative_bind());
	assert!(mounts[0].read_only);
	assert_eq!(mounts[1].kind, MountKind::Named);

	let configs = api.configs.as_ref().unwrap();
	assert_eq!(configs[0].source(), "app_config");
	assert_eq!(configs[0].target(), Some("/etc/app/config.yml"));
}
