//! Guest passes: the `{guest_id, event_id}` payload rendered as a PNG QR code
//! and shipped as base64 text.

use std::io::Cursor;

use base64ct::{Base64, Encoding};
use image::{ImageFormat, Luma};
use qrcode::{EcLevel, QrCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

const MIN_SIZE_PX: u32 = 256;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("serialize guest pass: {0}")]
    Payload(#[from] serde_json::Error),
    #[error("encode qr code: {0}")]
    Encode(#[from] qrcode::types::QrError),
    #[error("render png: {0}")]
    Render(#[from] image::ImageError),
}

/// What a scanner reads off the code. Field order is part of the format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GuestPass {
    pub guest_id: Uuid,
    pub event_id: Uuid,
}

impl GuestPass {
    pub fn to_payload(&self) -> Result<String, CredentialError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_payload(raw: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(raw)
    }
}

/// Same ids in, same string out.
pub fn encode_guest_pass(guest_id: Uuid, event_id: Uuid) -> Result<String, CredentialError> {
    let payload = GuestPass { guest_id, event_id }.to_payload()?;
    let png = render_png(payload.as_bytes())?;
    Ok(Base64::encode_string(&png))
}

fn render_png(data: &[u8]) -> Result<Vec<u8>, CredentialError> {
    let code = QrCode::with_error_correction_level(data, EcLevel::M)?;
    let img = code
        .render::<Luma<u8>>()
        .min_dimensions(MIN_SIZE_PX, MIN_SIZE_PX)
        .build();

    let mut png = Vec::new();
    img.write_to(&mut Cursor::new(&mut png), ImageFormat::Png)?;
    Ok(png)
}
