//! Browser entry point: mounts the concept hierarchy editor.

use concept_hierarchy_canvas::{App, init_logging};

fn main() {
	init_logging();
	leptos::mount::mount_to_body(App);
}
