use std::f64::consts::PI;

use wasm_bindgen::JsValue;
use web_sys::CanvasRenderingContext2d;

use super::state::CanvasState;
use crate::layout::{LinkKind, NodeClass};

/// Opacity and radius scale for a node class.
fn emphasis(class: NodeClass) -> (f64, f64) {
	match class {
		NodeClass::Normal => (1.0, 1.0),
		NodeClass::Selected => (1.0, 1.6),
		NodeClass::Neighbor => (1.0, 1.25),
		NodeClass::Match => (1.0, 1.3),
		NodeClass::Dimmed => (0.2, 0.85),
	}
}

pub fn render(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	ctx.set_fill_style_str("#1a1a2e");
	ctx.fill_rect(0.0, 0.0, state.engine.width(), state.engine.height());
	ctx.save();
	let _ = ctx.translate(state.transform.x, state.transform.y);
	let _ = ctx.scale(state.transform.k, state.transform.k);
	draw_links(state, ctx);
	draw_nodes(state, ctx);
	ctx.restore();
}

fn draw_links(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let radius = state.engine.config().node_radius;
	let (line_width, arrow_size) = (1.5 / k, 8.0 / k);

	for ((x1, y1), (x2, y2), kind) in state.engine.links() {
		let (dx, dy) = (x2 - x1, y2 - y1);
		let dist = (dx * dx + dy * dy).sqrt();
		if dist < 0.001 {
			continue;
		}
		let (ux, uy) = (dx / dist, dy / dist);

		match kind {
			LinkKind::Broader => {
				ctx.set_stroke_style_str("rgba(100, 180, 255, 0.6)");
				let _ = ctx.set_line_dash(&js_sys::Array::new());
			}
			LinkKind::Related => {
				ctx.set_stroke_style_str("rgba(255, 200, 120, 0.45)");
				let _ = ctx.set_line_dash(&js_sys::Array::of2(
					&JsValue::from_f64(6.0 / k),
					&JsValue::from_f64(4.0 / k),
				));
			}
		}
		ctx.set_line_width(line_width);
		ctx.begin_path();
		ctx.move_to(x1 + ux * radius, y1 + uy * radius);
		ctx.line_to(x2 - ux * radius, y2 - uy * radius);
		ctx.stroke();

		if kind == LinkKind::Broader {
			let _ = ctx.set_line_dash(&js_sys::Array::new());
			ctx.set_fill_style_str("rgba(100, 180, 255, 0.8)");
			let (tip_x, tip_y) = (x2 - ux * radius, y2 - uy * radius);
			let (back_x, back_y) = (tip_x - ux * arrow_size, tip_y - uy * arrow_size);
			let (px, py) = (-uy * arrow_size * 0.5, ux * arrow_size * 0.5);
			ctx.begin_path();
			ctx.move_to(tip_x, tip_y);
			ctx.line_to(back_x + px, back_y + py);
			ctx.line_to(back_x - px, back_y - py);
			ctx.close_path();
			ctx.fill();
		}
	}
	let _ = ctx.set_line_dash(&js_sys::Array::new());
}

fn draw_nodes(state: &CanvasState, ctx: &CanvasRenderingContext2d) {
	let k = state.transform.k;
	let base = state.engine.config().node_radius;

	state.engine.visit_nodes(|info, x, y| {
		let (alpha, scale) = emphasis(info.class);
		let radius = base * scale;
		ctx.set_global_alpha(alpha);
		ctx.begin_path();
		let _ = ctx.arc(x, y, radius, 0.0, 2.0 * PI);
		ctx.set_fill_style_str(&info.color);
		ctx.fill();

		let ring = match info.class {
			NodeClass::Selected => Some("rgba(255, 255, 255, 0.9)"),
			NodeClass::Match => Some("rgba(255, 220, 80, 0.9)"),
			_ if state.hovered.as_ref() == Some(&info.id) => Some("rgba(255, 255, 255, 0.5)"),
			_ => None,
		};
		if let Some(stroke) = ring {
			ctx.begin_path();
			let _ = ctx.arc(x, y, radius + 2.0 / k, 0.0, 2.0 * PI);
			ctx.set_stroke_style_str(stroke);
			ctx.set_line_width(1.5 / k);
			ctx.stroke();
		}

		ctx.set_fill_style_str(&format!("rgba(255, 255, 255, {})", alpha * 0.85));
		ctx.set_font(&format!("{}px sans-serif", 10.0 / k.max(0.5)));
		let _ = ctx.fill_text(&info.label, x + radius + 3.0, y + 3.0);
		ctx.set_global_alpha(1.0);
	});
}
