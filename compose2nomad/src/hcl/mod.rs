use std::fmt::{self, Display, Write};

use nomad_job_config::Job;

#[macro_use]
mod macros;
mod emit;

const INDENT: &str = "  ";

/// Closes the heredocs used for multi-line strings.
const HEREDOC_MARKER: &str = "EOH";

/// Lists of scalars are kept on one line up to this width.
const INLINE_LIST_WIDTH: usize = 80;

/// Options for the rendering of a job.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct HclOptions {
	/// Adds a header and the name of the source service above each group.
	pub include_comments: bool,
}

/// A value on the right side of an attribute.
#[derive(Clone, Debug, PartialEq)]
pub enum Expr {
	String(String),
	/// A string whose `${...}` sequences are left for Nomad to interpolate.
	Interpolated(String),
	Int(i64),
	Float(f64),
	Bool(bool),
	List(Vec<Expr>),
	Map(Vec<(String, Expr)>),
}

impl Expr {
	const fn is_scalar(&self) -> bool {
		!matches!(self, Self::List(_) | Self::Map(_))
	}
}

macro_rules! impl_int_expr {
	($($ty:ty),*) => {
		$(
			impl From<$ty> for Expr {
				fn from(value: $ty) -> Self {
					Self::Int(i64::from(value))
				}
			}
		)*
	};
}

impl_int_expr!(u8, u16, u32, i8, i32, i64);

impl From<f64> for Expr {
	fn from(value: f64) -> Self {
		Self::Float(value)
	}
}

impl From<bool> for Expr {
	fn from(value: bool) -> Self {
		Self::Bool(value)
	}
}

impl From<&str> for Expr {
	fn from(value: &str) -> Self {
		Self::String(value.to_string())
	}
}

impl From<String> for Expr {
	fn from(value: String) -> Self {
		Self::String(value)
	}
}

impl From<&String> for Expr {
	fn from(value: &String) -> Self {
		Self::String(value.clone())
	}
}

impl From<&Vec<String>> for Expr {
	fn from(value: &Vec<String>) -> Self {
		Self::List(value.iter().map(Self::from).collect())
	}
}

/// A single entry in the body of a block.
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
	Attribute { name: String, value: Expr },
	Block(Block),
	Comment(String),
}

/// A block such as `group "web" { ... }`.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Block {
	pub kind: String,
	pub labels: Vec<String>,
	pub body: Vec<Node>,
}

impl Block {
	pub fn new(kind: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			..Default::default()
		}
	}

	pub fn labeled(kind: impl Into<String>, label: impl Into<String>) -> Self {
		Self {
			kind: kind.into(),
			labels: vec![label.into()],
			body: vec![],
		}
	}

	pub fn attr(&mut self, name: impl Into<String>, value: impl Into<Expr>) {
		self.body.push(Node::Attribute {
			name: name.into(),
			value: value.into(),
		});
	}

	pub fn block(&mut self, block: Block) {
		self.body.push(Node::Block(block));
	}

	pub fn comment(&mut self, text: impl Into<String>) {
		self.body.push(Node::Comment(text.into()));
	}
}

impl Display for Block {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_block(f, self, 0)
	}
}

/// A whole file, made of top-level nodes.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct Document {
	pub body: Vec<Node>,
}

impl Display for Document {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write_body(f, &self.body, 0)
	}
}

fn is_identifier(key: &str) -> bool {
	let mut chars = key.chars();

	chars
		.next()
		.is_some_and(|first| first.is_ascii_alphabetic() || first == '_')
		&& chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

/// Escapes a string for a literal context, such as a block label.
fn escape_literal(value: &str) -> String {
	let mut escaped = String::with_capacity(value.len());

	for c in value.chars() {
		match c {
			'\\' => escaped.push_str("\\\\"),
			'"' => escaped.push_str("\\\""),
			'\n' => escaped.push_str("\\n"),
			'\r' => escaped.push_str("\\r"),
			'\t' => escaped.push_str("\\t"),
			c => escaped.push(c),
		}
	}

	escaped
}

/// Doubles the `${` and `%{` sequences that HCL would read as interpolations or directives.
fn escape_template_sequences(value: &str) -> String {
	value.replace("${", "$${").replace("%{", "%%{")
}

/// Escapes a string for a quoted template, the context of every attribute value.
fn escape(value: &str) -> String {
	escape_template_sequences(&escape_literal(value))
}

/// The first marker that does not close the heredoc early.
fn heredoc_marker(content: &str) -> String {
	let mut marker = HEREDOC_MARKER.to_string();
	let mut suffix = 0;

	while content.lines().any(|line| line.trim() == marker) {
		suffix += 1;
		marker = format!("{HEREDOC_MARKER}{suffix}");
	}

	marker
}

fn write_key(out: &mut impl Write, key: &str) -> fmt::Result {
	if is_identifier(key) {
		out.write_str(key)
	} else {
		write!(out, "\"{}\"", escape(key))
	}
}

fn key_width(key: &str) -> usize {
	if is_identifier(key) {
		key.len()
	} else {
		escape(key).len() + 2
	}
}

fn write_indent(out: &mut impl Write, indent: usize) -> fmt::Result {
	for _ in 0..indent {
		out.write_str(INDENT)?;
	}

	Ok(())
}

fn write_expr(out: &mut impl Write, expr: &Expr, indent: usize) -> fmt::Result {
	match expr {
		Expr::String(s) if s.contains('\n') => {
			let marker = heredoc_marker(s);

			writeln!(out, "<<{marker}")?;
			out.write_str(&escape_template_sequences(s))?;

			if !s.ends_with('\n') {
				out.write_char('\n')?;
			}

			out.write_str(&marker)
		}
		Expr::String(s) => write!(out, "\"{}\"", escape(s)),
		Expr::Interpolated(s) => write!(out, "\"{}\"", escape_literal(s)),
		Expr::Int(i) => write!(out, "{i}"),
		Expr::Float(n) => write!(out, "{n}"),
		Expr::Bool(b) => write!(out, "{b}"),
		Expr::List(items) if items.is_empty() => out.write_str("[]"),
		Expr::List(items) => {
			if items.iter().all(Expr::is_scalar) {
				let mut inline = String::new();

				for (index, item) in items.iter().enumerate() {
					if index > 0 {
						inline.push_str(", ");
					}

					write_expr(&mut inline, item, indent)?;
				}

				if !inline.contains('\n') && inline.len() <= INLINE_LIST_WIDTH {
					return write!(out, "[{inline}]");
				}
			}

			out.write_str("[\n")?;

			for item in items {
				write_indent(out, indent + 1)?;
				write_expr(out, item, indent + 1)?;
				out.write_str(",\n")?;
			}

			write_indent(out, indent)?;
			out.write_char(']')
		}
		Expr::Map(entries) if entries.is_empty() => out.write_str("{}"),
		Expr::Map(entries) => {
			let width = entries
				.iter()
				.map(|(key, _)| key_width(key))
				.max()
				.unwrap_or_default();

			out.write_str("{\n")?;

			for (key, value) in entries {
				write_indent(out, indent + 1)?;
				write_key(out, key)?;

				for _ in key_width(key)..width {
					out.write_char(' ')?;
				}

				out.write_str(" = ")?;
				write_expr(out, value, indent + 1)?;
				out.write_char('\n')?;
			}

			write_indent(out, indent)?;
			out.write_char('}')
		}
	}
}

fn write_block(out: &mut impl Write, block: &Block, indent: usize) -> fmt::Result {
	write_indent(out, indent)?;
	out.write_str(&block.kind)?;

	for label in &block.labels {
		write!(out, " \"{}\"", escape_literal(label))?;
	}

	if block.body.is_empty() {
		return out.write_str(" {}\n");
	}

	out.write_str(" {\n")?;
	write_body(out, &block.body, indent + 1)?;
	write_indent(out, indent)?;
	out.write_str("}\n")
}

/// Writes a sequence of nodes, aligning the `=` of consecutive attributes and
/// separating blocks from their neighbours with a blank line.
fn write_body(out: &mut impl Write, nodes: &[Node], indent: usize) -> fmt::Result {
	for (index, node) in nodes.iter().enumerate() {
		if index > 0 {
			let previous = &nodes[index - 1];

			let separate = !matches!(previous, Node::Comment(_))
				&& (matches!(previous, Node::Block(_))
					|| matches!(node, Node::Block(_) | Node::Comment(_)));

			if separate {
				out.write_char('\n')?;
			}
		}

		match node {
			Node::Comment(text) => {
				for line in text.lines() {
					write_indent(out, indent)?;
					writeln!(out, "# {line}")?;
				}
			}
			Node::Block(block) => write_block(out, block, indent)?,
			Node::Attribute { name, value } => {
				// The width of the run of attributes this one belongs to
				let run_start = nodes[..index]
					.iter()
					.rposition(|node| !matches!(node, Node::Attribute { .. }))
					.map_or(0, |position| position + 1);

				let width = nodes[run_start..]
					.iter()
					.map_while(|node| match node {
						Node::Attribute { name, .. } => Some(key_width(name)),
						_ => None,
					})
					.max()
					.unwrap_or_default();

				write_indent(out, indent)?;
				write_key(out, name)?;

				for _ in key_width(name)..width {
					out.write_char(' ')?;
				}

				out.write_str(" = ")?;
				write_expr(out, value, indent)?;
				out.write_char('\n')?;
			}
		}
	}

	Ok(())
}

/// Renders a job as a Nomad job specification.
pub fn generate_hcl(job: &Job, options: &HclOptions) -> String {
	let mut document = Document::default();

	if options.include_comments {
		document.body.push(Node::Comment(format!(
			"Nomad job `{}`, generated by compose2nomad from a Docker Compose file.",
			job.id
		)));
	}

	document
		.body
		.push(Node::Block(emit::job_block(job, options)));

	document.to_string()
}

/// The placeholder rendered when a conversion produced no job.
pub fn render_errors(errors: &[String]) -> String {
	let document = Document {
		body: errors
			.iter()
			.map(|error| Node::Comment(format!("ERROR: {error}")))
			.collect(),
	};

	document.to_string()
}

#[cfg(test)]
mod tests {
	use indoc::indoc;
	use pretty_assertions::assert_eq;

	use super::*;

	#[test]
	fn attributes_are_aligned() {
		let mut block = Block::labeled("task", "web");
		block.attr("driver", "docker");
		block.attr("kill_timeout", "10s");

		let mut resources = Block::new("resources");
		resources.attr("cpu", 500_u32);
		resources.attr("memory", 256_u32);
		block.block(resources);

		block.attr("user", "nobody");

		assert_eq!(
			block.to_string(),
			indoc! {r#"
				task "web" {
				  driver       = "docker"
				  kill_timeout = "10s"

				  resources {
				    cpu    = 500
				    memory = 256
				  }

				  user = "nobody"
				}
			"#}
		);
	}

	#[test]
	fn strings_are_escaped() {
		let mut block = Block::new("config");
		block.attr("command", "echo \"hi\"\tthere");

		assert_eq!(
			block.to_string(),
			"config {\n  command = \"echo \\\"hi\\\"\\tthere\"\n}\n"
		);
	}

	#[test]
	fn multiline_strings_use_heredocs() {
		let mut block = Block::new("template");
		block.attr("data", "a = 1\nb = 2\n");

		assert_eq!(
			block.to_string(),
			indoc! {r#"
				template {
				  data = <<EOH
				a = 1
				b = 2
				EOH
				}
			"#}
		);
	}

	#[test]
	fn template_sequences_are_escaped() {
		let mut block = Block::labeled("task", "${web}");
		block.attr("command", "echo ${HOME} %{ if true }");
		block.attr(
			"labels",
			Expr::Map(vec![("${tier}".to_string(), "%{front}".into())]),
		);
		block.attr("attribute", Expr::Interpolated("${attr.kernel.name}".to_string()));

		assert_eq!(
			block.to_string(),
			indoc! {r#"
				task "${web}" {
				  command   = "echo $${HOME} %%{ if true }"
				  labels    = {
				    "$${tier}" = "%%{front}"
				  }
				  attribute = "${attr.kernel.name}"
				}
			"#}
		);
	}

	#[test]
	fn heredoc_content_is_escaped() {
		let mut block = Block::new("template");
		block.attr("data", "home = ${HOME}\nEOH\n");

		assert_eq!(
			block.to_string(),
			indoc! {r#"
				template {
				  data = <<EOH1
				home = $${HOME}
				EOH
				EOH1
				}
			"#}
		);
	}

	#[test]
	fn maps_and_lists() {
		let mut block = Block::new("config");
		block.attr("ports", Expr::List(vec!["port_0".into(), "expose_0".into()]));
		block.attr(
			"labels",
			Expr::Map(vec![
				("com.example.team".to_string(), "web".into()),
				("tier".to_string(), "front".into()),
			]),
		);

		assert_eq!(
			block.to_string(),
			indoc! {r#"
				config {
				  ports  = ["port_0", "expose_0"]
				  labels = {
				    "com.example.team" = "web"
				    tier               = "front"
				  }
				}
			"#}
		);
	}

	#[test]
	fn error_placeholder() {
		assert_eq!(
			render_errors(&["No services defined".to_string(), "Invalid YAML".to_string()]),
			"# ERROR: No services defined\n# ERROR: Invalid YAML\n"
		);
	}
}
