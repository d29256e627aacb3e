use compose2nomad::{
	ConvertOptions, HclOptions, convert_yaml, generate_hcl,
	nomad_job_config::{Job, TaskGroup},
};
use indoc::indoc;
use pretty_assertions::assert_eq;

const WEB: &str = indoc! {r#"
	version: '3.8'
	services:
	  web:
	    image: nginx:alpine
	    ports: ["80:80"]
"#};

#[test]
fn web_service_job() {
	let result = convert_yaml(WEB, &ConvertOptions::default());

	assert_eq!(
		result.to_hcl(false),
		indoc! {r#"
			job "docker-compose" {
			  region      = "global"
			  datacenters = ["dc1"]
			  type        = "service"
			  priority    = 50
			  namespace   = "default"

			  update {
			    stagger      = "10s"
			    max_parallel = 2
			  }

			  group "web" {
			    count = 1

			    network {
			      mode = "bridge"

			      port "port_0" {
			        static = 80
			        to     = 80
			      }
			    }

			    service {
			      name = "web-0"
			      port = "port_0"
			      tags = ["docker-compose"]
			    }

			    restart {
			      attempts = 3
			      delay    = "15s"
			      interval = "5m"
			      mode     = "delay"
			    }

			    task "web" {
			      driver = "docker"

			      config {
			        image = "nginx:alpine"
			        ports = ["port_0"]
			      }

			      resources {
			        cpu    = 100
			        memory = 128
			      }
			    }
			  }
			}
		"#}
	);
}

#[test]
fn comments_name_the_source_services() {
	let result = convert_yaml(WEB, &ConvertOptions::default());

	let hcl = result.to_hcl(true);

	assert!(hcl.starts_with("# Nomad job `docker-compose`"));
	assert!(hcl.contains("  # Compose service: web\n  group \"web\" {"));
}

#[test]
fn templates_and_environment() {
	let result = convert_yaml(
		indoc! {r#"
			version: '3.8'
			services:
			  app:
			    image: example/app
			    environment:
			      LOG_LEVEL: debug
			    configs:
			      - app_config
			configs:
			  app_config:
			    content: |
			      mode = "production"
			      workers = 4
		"#},
		&ConvertOptions::default(),
	);

	let hcl = result.to_hcl(false);

	assert!(hcl.contains(indoc! {r#"
		      env {
		        LOG_LEVEL = "debug"
		      }
	"#}));

	assert!(hcl.contains(indoc! {r#"
		      template {
		        data        = <<EOH
		mode = "production"
		workers = 4
		EOH
		        destination = "local/app_config"
		        change_mode = "restart"
		      }
	"#}));
}

#[test]
fn job_names_are_only_written_when_they_differ() {
	let mut job = Job::new("shop");
	job.name = "Shop frontend".to_string();
	job.update = None;
	job.groups.insert("web".to_string(), TaskGroup::default());

	let hcl = generate_hcl(&job, &HclOptions::default());

	assert!(hcl.starts_with("job \"shop\" {\n  name        = \"Shop frontend\"\n"));
	assert!(hcl.contains("  group \"web\" {\n    count = 1\n  }\n"));
}

#[test]
fn aborted_conversions_render_placeholders() {
	let result = convert_yaml("version: '3.8'\n", &ConvertOptions::default());

	assert_eq!(result.to_hcl(false), "# ERROR: No services defined\n");
}

#[test]
fn compose_values_are_not_interpolated_by_nomad() {
	let result = convert_yaml(
		indoc! {r#"
			version: '3.8'
			services:
			  app:
			    image: example/app
			    environment:
			      GREETING: "hello ${USER}"
			    deploy:
			      placement:
			        constraints:
			          - node.platform.os == linux
		"#},
		&ConvertOptions::default(),
	);

	let hcl = result.to_hcl(false);

	assert!(hcl.contains(r#"GREETING = "hello $${USER}""#));
	assert!(hcl.contains(r#"attribute = "${attr.kernel.name}""#));
}
