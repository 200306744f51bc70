use std::sync::Arc;

use leptos::prelude::*;
use leptos::ev::MouseEvent;
use leptos::task::spawn_local;
use log::warn;

use crate::components::concept_tree::ConceptTree;
use crate::components::force_graph::ForceGraphCanvas;
use crate::config::EditorConfig;
use crate::editor::HierarchyEditor;
use crate::hierarchy::ReparentCommand;
use crate::layout::GraphData;
use crate::model::{ConceptId, ConceptRecord};
use crate::repository::{ConceptRepository, MemoryRepository, fetch_model, reparent_and_refresh};

const SCHEMES: &[&str] = &["animals", "materials"];

/// Settings shipped with the app.
const BUNDLED_CONFIG: &str = include_str!("../../config/editor.json");

/// The bundled settings, or the defaults if they do not parse.
fn bundled_config() -> EditorConfig {
	EditorConfig::from_json(BUNDLED_CONFIG).unwrap_or_else(|err| {
		warn!("{}, using defaults", err);
		EditorConfig::default()
	})
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ViewMode {
	Tree,
	Graph,
}

/// Two small vocabularies with some polyhierarchy and related links.
fn sample_repository() -> MemoryRepository {
	let animals = vec![
		ConceptRecord::new("animals", "Animals").with_definition("Multicellular organisms"),
		ConceptRecord::new("mammals", "Mammals").with_broader("animals"),
		ConceptRecord::new("birds", "Birds").with_broader("animals"),
		ConceptRecord::new("pets", "Pets").with_alt_label("Companion animals"),
		ConceptRecord::new("canines", "Canines").with_broader("mammals"),
		ConceptRecord::new("dogs", "Dogs")
			.with_broader("canines")
			.with_broader("pets")
			.with_alt_label("Hounds")
			.with_related("wolves"),
		ConceptRecord::new("wolves", "Wolves").with_broader("canines"),
		ConceptRecord::new("cats", "Cats")
			.with_broader("mammals")
			.with_broader("pets")
			.with_alt_label("Felines"),
		ConceptRecord::new("parrots", "Parrots")
			.with_broader("birds")
			.with_broader("pets"),
		ConceptRecord::new("crows", "Crows").with_broader("birds"),
	];
	let materials = vec![
		ConceptRecord::new("materials", "Materials"),
		ConceptRecord::new("metals", "Metals").with_broader("materials"),
		ConceptRecord::new("alloys", "Alloys").with_broader("metals"),
		ConceptRecord::new("steel", "Steel")
			.with_broader("alloys")
			.with_related("iron"),
		ConceptRecord::new("iron", "Iron").with_broader("metals"),
		ConceptRecord::new("polymers", "Polymers")
			.with_broader("materials")
			.with_alt_label("Plastics"),
	];
	MemoryRepository::new()
		.with_scheme("animals", animals)
		.with_scheme("materials", materials)
}

/// Default Home Page
#[component]
pub fn Home() -> impl IntoView {
	let repository: Arc<dyn ConceptRepository> = Arc::new(sample_repository());
	let config = bundled_config();
	let layout_config = config.layout.clone();
	let editor = RwSignal::new(HierarchyEditor::new(config));
	let view_mode = RwSignal::new(ViewMode::Tree);

	let load_scheme = {
		let repository = repository.clone();
		move |scheme: String| {
			editor.update(|e| e.begin_scheme(scheme.clone()));
			let repository = repository.clone();
			spawn_local(async move {
				let result = fetch_model(repository.as_ref(), &scheme).await;
				editor.update(|e| {
					if let Err(err) = e.finish_load(&scheme, result) {
						warn!("could not load {}: {}", scheme, err);
					}
				});
			});
		}
	};
	load_scheme(SCHEMES[0].to_string());

	// re-fetch the active scheme without resetting the session
	let reload = {
		let repository = repository.clone();
		move |_: MouseEvent| {
			let Some(scheme) = editor.with_untracked(|e| e.scheme().map(str::to_owned)) else {
				return;
			};
			let repository = repository.clone();
			spawn_local(async move {
				let result = fetch_model(repository.as_ref(), &scheme).await;
				editor.update(|e| {
					if let Err(err) = e.finish_load(&scheme, result) {
						warn!("could not reload {}: {}", scheme, err);
					}
				});
			});
		}
	};

	let on_reparent = Callback::new(move |command: ReparentCommand| {
		let Some(scheme) = editor.with_untracked(|e| e.scheme().map(str::to_owned)) else {
			return;
		};
		let repository = repository.clone();
		spawn_local(async move {
			let result = reparent_and_refresh(repository.as_ref(), &scheme, &command).await;
			editor.update(|e| {
				if let Err(err) = e.finish_reparent(&scheme, &command, result) {
					warn!("reparent failed: {}", err);
				}
			});
		});
	});

	let graph_data = Memo::new(move |_| editor.with(|e| GraphData::from_model(e.graph())));
	let selected = Signal::derive(move || editor.with(|e| e.selected().cloned()));
	let matches = Signal::derive(move || editor.with(|e| e.matching_ids()));
	let on_graph_select = Callback::new(move |id: Option<ConceptId>| {
		editor.update(|e| {
			e.on_select(id);
			e.reveal_selection();
		});
	});

	view! {
		<ErrorBoundary fallback=|errors| {
			view! {
				<h1>"Uh oh! Something went wrong!"</h1>

				<p>"Errors: "</p>
				<ul>
					{move || {
						errors
							.get()
							.into_iter()
							.map(|(_, e)| view! { <li>{e.to_string()}</li> })
							.collect_view()
					}}
				</ul>
			}
		}>

			<div class="editor">
				<header class="editor-toolbar">
					<select on:change=move |ev| load_scheme(event_target_value(&ev))>
						{SCHEMES
							.iter()
							.map(|scheme| view! { <option value=*scheme>{*scheme}</option> })
							.collect_view()}
					</select>
					<input
						type="search"
						placeholder="Search labels"
						prop:value=move || editor.with(|e| e.query().to_owned())
						on:input=move |ev| {
							editor.update(|e| e.on_search_query_change(&event_target_value(&ev)))
						}
					/>
					<button on:click=move |_| editor.update(|e| e.expand_all())>"Expand all"</button>
					<button on:click=move |_| editor.update(|e| e.collapse_all())>"Collapse all"</button>
					<button on:click=move |_| view_mode.set(ViewMode::Tree)>"Tree"</button>
					<button on:click=move |_| view_mode.set(ViewMode::Graph)>"Graph"</button>
				</header>

				{move || {
					let reload = reload.clone();
					editor
						.with(|e| e.is_stale())
						.then(|| view! { <button class="reload" on:click=reload>"Reload"</button> })
				}}
				{move || {
					editor
						.with(|e| e.last_error().map(str::to_owned))
						.map(|message| {
							view! {
								<div class="error-banner" on:click=move |_| editor.update(|e| e.clear_error())>
									{message}
								</div>
							}
						})
				}}

				<section
					class="tree-view"
					style:display=move || if view_mode.get() == ViewMode::Tree { "block" } else { "none" }
				>
					<ConceptTree editor=editor on_reparent=on_reparent />
				</section>
				// kept mounted while hidden so the layout is not reseeded on every switch
				<section
					class="graph-view"
					style:display=move || if view_mode.get() == ViewMode::Graph { "block" } else { "none" }
				>
					<ForceGraphCanvas
						data=graph_data
						selected=selected
						matches=matches
						on_select=on_graph_select
						config=layout_config
						width=Some(960.0)
						height=Some(640.0)
					/>
				</section>
			</div>
		</ErrorBoundary>
	}
}
