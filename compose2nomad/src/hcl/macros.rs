macro_rules! attr_name {
	($name:ident) => {
		stringify!($name).trim_end_matches('_')
	};
}

macro_rules! add_value {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			$block.attr(attr_name!($names), $target.$names);
		)*
	};
}

macro_rules! add_string {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			$block.attr(attr_name!($names), &$target.$names);
		)*
	};
}

/// Adds a string that Nomad interpolates at runtime, such as `${attr.kernel.name}`.
macro_rules! add_interpolated {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			$block.attr(attr_name!($names), Expr::Interpolated($target.$names.to_string()));
		)*
	};
}

macro_rules! add_display {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			$block.attr(attr_name!($names), $target.$names.to_string());
		)*
	};
}

macro_rules! add_optional_string {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			if let Some(value) = &$target.$names {
				$block.attr(attr_name!($names), value);
			}
		)*
	};
}

macro_rules! add_optional_value {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			if let Some(value) = $target.$names {
				$block.attr(attr_name!($names), value);
			}
		)*
	};
}

macro_rules! add_string_list {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			if !$target.$names.is_empty() {
				$block.attr(attr_name!($names), &$target.$names);
			}
		)*
	};
}

/// Adds a string map as a block, such as `meta { ... }`.
macro_rules! add_map_block {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			if !$target.$names.is_empty() {
				let mut map_block = Block::new(attr_name!($names));

				for (key, value) in &$target.$names {
					map_block.attr(key, value);
				}

				$block.block(map_block);
			}
		)*
	};
}

/// Adds one block per item, for fields such as `constraints`.
macro_rules! add_blocks {
	($target:ident, $block:ident => $($names:ident),*) => {
		$(
			for item in &$target.$names {
				$block.block(item.as_hcl());
			}
		)*
	};
}
