use leptos::ev::{DragEvent, MouseEvent};
use leptos::prelude::*;
use log::{debug, warn};

use crate::editor::HierarchyEditor;
use crate::hierarchy::{DropOutcome, DropTarget, DropValidity, MatchStatus, RenderNode, ReparentCommand};

/// Hover a target during a drag and tell the browser whether it may drop.
fn drag_over(
	editor: RwSignal<HierarchyEditor>,
	target: DropTarget,
	ev: &DragEvent,
) -> Option<DropValidity> {
	ev.stop_propagation();
	let validity = editor.try_update_untracked(|e| e.on_drag_over(target, ev.alt_key()))?;
	if validity.is_valid() {
		ev.prevent_default();
	}
	Some(validity)
}

/// Release on a target; a confirmed drop is handed to `on_reparent`.
fn drop_on(
	editor: RwSignal<HierarchyEditor>,
	target: DropTarget,
	ev: &DragEvent,
	on_reparent: Callback<ReparentCommand>,
) {
	ev.prevent_default();
	ev.stop_propagation();
	match editor.try_update(|e| e.on_drag_end(Some(target), ev.alt_key())) {
		Some(Ok(DropOutcome::Issued(command))) => on_reparent.run(command),
		Some(Ok(outcome)) => debug!("drop finished without request: {:?}", outcome),
		Some(Err(err)) => warn!("drop rejected: {}", err),
		None => {}
	}
}

fn drop_class(validity: Option<DropValidity>) -> &'static str {
	match validity {
		Some(v) if v.is_valid() => " drop-valid",
		Some(DropValidity::NotDragging) | None => "",
		Some(_) => " drop-invalid",
	}
}

/// Expand/collapse tree of the projected forest with drag-and-drop
/// reparenting. Holding Alt while dropping adds a parent instead of moving.
#[component]
pub fn ConceptTree(
	editor: RwSignal<HierarchyEditor>,
	#[prop(into)] on_reparent: Callback<ReparentCommand>,
) -> impl IntoView {
	let forest = Memo::new(move |_| editor.with(|e| e.forest().clone()));
	let root_drop = RwSignal::new(None::<DropValidity>);

	view! {
		<div class="concept-tree">
			<div
				class=move || format!("tree-root-drop{}", drop_class(root_drop.get()))
				on:dragover=move |ev: DragEvent| {
					root_drop.set(drag_over(editor, DropTarget::Root, &ev));
				}
				on:dragleave=move |_| root_drop.set(None)
				on:drop=move |ev: DragEvent| {
					root_drop.set(None);
					drop_on(editor, DropTarget::Root, &ev, on_reparent);
				}
			>
				"Drop here to make a top concept"
			</div>
			<ul class="tree">
				{move || {
					forest
						.get()
						.roots
						.iter()
						.cloned()
						.map(|node| {
							view! { <TreeRow node=node editor=editor on_reparent=on_reparent /> }
						})
						.collect_view()
				}}
			</ul>
			{move || {
				forest
					.with(|f| f.is_empty())
					.then(|| view! { <p class="tree-empty">"No concepts in this scheme"</p> })
			}}
		</div>
	}
}

#[component]
fn TreeRow(
	node: RenderNode,
	editor: RwSignal<HierarchyEditor>,
	on_reparent: Callback<ReparentCommand>,
) -> AnyView {
	let RenderNode {
		id,
		path,
		depth,
		label,
		children,
		has_multiple_parents,
		other_parent_labels,
		match_status,
		..
	} = node;
	let has_children = !children.is_empty();
	let hover = RwSignal::new(None::<DropValidity>);

	let expanded = {
		let path = path.clone();
		Memo::new(move |_| editor.with(|e| e.is_expanded(&path)))
	};
	let row_class = {
		let id = id.clone();
		move || {
			let (selected, searching, pending) = editor.with(|e| {
				(
					e.selected() == Some(&id),
					e.is_searching(),
					e.is_reparent_pending(&id),
				)
			});
			let mut class = String::from("tree-row");
			match match_status {
				MatchStatus::Match => class.push_str(" match"),
				MatchStatus::Ancestor => class.push_str(" match-ancestor"),
				MatchStatus::None if searching => class.push_str(" dimmed"),
				MatchStatus::None => {}
			}
			if selected {
				class.push_str(" selected");
			}
			if pending {
				class.push_str(" pending");
			}
			class.push_str(drop_class(hover.get()));
			class
		}
	};

	let on_toggle = {
		let path = path.clone();
		move |ev: MouseEvent| {
			ev.stop_propagation();
			editor.update(|e| {
				e.on_toggle_expand(&path);
			});
		}
	};
	let on_click = {
		let id = id.clone();
		move |_: MouseEvent| editor.update(|e| e.on_select(Some(id.clone())))
	};
	let on_dragstart = {
		let (id, path) = (id.clone(), path.clone());
		move |ev: DragEvent| {
			ev.stop_propagation();
			let started = editor
				.try_update_untracked(|e| e.on_drag_start(id.clone(), &path))
				.unwrap_or(false);
			if !started {
				ev.prevent_default();
				return;
			}
			if let Some(transfer) = ev.data_transfer() {
				let _ = transfer.set_data("text/plain", id.as_str());
				transfer.set_effect_allowed("copyMove");
			}
		}
	};
	let on_dragover = {
		let id = id.clone();
		move |ev: DragEvent| hover.set(drag_over(editor, DropTarget::Concept(id.clone()), &ev))
	};
	let on_drop = {
		let id = id.clone();
		move |ev: DragEvent| {
			hover.set(None);
			drop_on(editor, DropTarget::Concept(id.clone()), &ev, on_reparent);
		}
	};
	let on_dragend = move |_: DragEvent| editor.update_untracked(|e| e.on_drag_cancel());

	let badge = has_multiple_parents.then(|| {
		let title = format!("Also under: {}", other_parent_labels.join(", "));
		view! { <span class="poly-badge" title=title>{format!("+{}", other_parent_labels.len())}</span> }
	});

	view! {
		<li class="tree-node">
			<div
				class=row_class
				draggable="true"
				style=format!("padding-left: {}px", depth * 16)
				on:click=on_click
				on:dragstart=on_dragstart
				on:dragover=on_dragover
				on:dragleave=move |_| hover.set(None)
				on:drop=on_drop
				on:dragend=on_dragend
			>
				{has_children
					.then(|| {
						view! {
							<button class="tree-toggle" on:click=on_toggle>
								{move || if expanded.get() { "\u{25be}" } else { "\u{25b8}" }}
							</button>
						}
					})}
				<span class="tree-label">{label}</span>
				{badge}
			</div>
			{move || {
				(has_children && expanded.get())
					.then(|| {
						view! {
							<ul class="tree-children">
								{children
									.iter()
									.cloned()
									.map(|child| {
										view! { <TreeRow node=child editor=editor on_reparent=on_reparent /> }
									})
									.collect_view()}
							</ul>
						}
					})
			}}
		</li>
	}
	.into_any()
}
