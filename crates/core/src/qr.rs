//! QR rendering of the pairing payload.
//!
//! Rendering is a side channel: [`SessionManager`](crate::SessionManager)
//! logs render failures and still returns the pairing payload, which callers
//! can share through any other medium.

use std::fmt::Write as _;

use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64;
use qrcodegen::{QrCode, QrCodeEcc};

use crate::error::{Error, Result};

/// Renders pairing text into a displayable QR representation.
pub trait QrRenderer: Send + Sync {
	fn render(&self, payload: &str) -> Result<String>;
}

/// Standard quiet zone around the symbol, in modules.
const QUIET_ZONE: i32 = 2;

fn encode(payload: &str) -> Result<QrCode> {
	// High error correction: the code is often scanned from screens at an angle.
	QrCode::encode_text(payload, QrCodeEcc::High).map_err(|e| Error::QrRender(e.to_string()))
}

/// Produces an SVG image wrapped in a `data:` URL, suitable for `<img src>`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SvgDataUrlRenderer;

impl SvgDataUrlRenderer {
	fn svg(code: &QrCode) -> String {
		let size = code.size() + QUIET_ZONE * 2;
		let mut path = String::new();
		for y in 0..code.size() {
			for x in 0..code.size() {
				if code.get_module(x, y) {
					let _ = write!(path, "M{},{}h1v1h-1z", x + QUIET_ZONE, y + QUIET_ZONE);
				}
			}
		}
		format!(
			concat!(
				r#"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 {size} {size}" shape-rendering="crispEdges">"#,
				r##"<rect width="100%" height="100%" fill="#ffffff"/><path d="{path}" fill="#000000"/></svg>"##
			),
			size = size,
			path = path
		)
	}
}

impl QrRenderer for SvgDataUrlRenderer {
	fn render(&self, payload: &str) -> Result<String> {
		let code = encode(payload)?;
		Ok(format!("data:image/svg+xml;base64,{}", BASE64.encode(Self::svg(&code))))
	}
}

/// Renders the code as Unicode half-block rows for terminal display.
///
/// Two QR rows share one terminal row, which keeps the symbol roughly square
/// since terminal cells are about twice as tall as they are wide.
#[derive(Debug, Clone, Copy, Default)]
pub struct TerminalQrRenderer;

impl TerminalQrRenderer {
	pub fn lines(payload: &str) -> Result<Vec<String>> {
		let code = encode(payload)?;
		let size = code.size();
		let dark = |x: i32, y: i32| code.get_module(x - QUIET_ZONE, y - QUIET_ZONE);
		let total = size + QUIET_ZONE * 2;

		let mut lines = Vec::with_capacity(((total + 1) / 2) as usize);
		for row in (0..total).step_by(2) {
			let line: String = (0..total)
				.map(|x| match (dark(x, row), dark(x, row + 1)) {
					(true, true) => ' ',
					(true, false) => '▄',
					(false, true) => '▀',
					(false, false) => '█',
				})
				.collect();
			lines.push(line);
		}
		Ok(lines)
	}
}

impl QrRenderer for TerminalQrRenderer {
	fn render(&self, payload: &str) -> Result<String> {
		Ok(Self::lines(payload)?.join("\n"))
	}
}
