use std::time::Duration;

use bevy::log::{debug, warn};
use bevy::math::Vec3;
use constants::network::{AUDIO_FIELD, IMAGE_FIELD, INVENTORY_ENDPOINT, ROOMS_ENDPOINT};
use reqwest::blocking::multipart::{Form, Part};
use reqwest::blocking::{Client, RequestBuilder};

use super::records::{parse_created, parse_rooms, parse_update};
use super::{
    CreatedRecord, GatewayError, GatewayResult, InventoryGateway, InventoryRecord, MediaPayload,
    RecordId, UpdateReceipt,
};
use crate::config::AnnotationConfig;

/// Inventory service client over blocking HTTP.
///
/// Text writes are JSON POSTs; photo and audio writes are multipart POSTs
/// with the media under `image` / `audio` and coordinates as `x`, `y`, `z`
/// text fields.
#[derive(Clone)]
pub struct HttpInventoryGateway {
    base_url: String,
    client: Client,
}

impl HttpInventoryGateway {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GatewayError::Transport(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    pub fn from_config(config: &AnnotationConfig) -> GatewayResult<Self> {
        Self::new(config.api_base_url.clone(), config.http_timeout)
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn create_endpoint(&self, modality: &str) -> String {
        self.endpoint(&format!("{INVENTORY_ENDPOINT}/{modality}"))
    }

    fn update_endpoint(&self, id: RecordId, modality: &str) -> String {
        self.endpoint(&format!("{INVENTORY_ENDPOINT}/{id}/{modality}"))
    }

    /// Send and return the body of a 2xx reply; everything else is a failure.
    fn send(&self, request: RequestBuilder) -> GatewayResult<String> {
        let response = request.send().map_err(transport_error)?;
        let status = response.status();
        let body = response.text().map_err(transport_error)?;

        if !status.is_success() {
            warn!("Inventory service returned {}", status);
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }

    fn media_form(field: &'static str, media: &MediaPayload) -> GatewayResult<Form> {
        let part = Part::bytes(media.bytes.clone())
            .file_name(media.file_name.clone())
            .mime_str(&media.mime_type)
            .map_err(|e| GatewayError::Encoding(format!("invalid MIME type: {e}")))?;
        Ok(Form::new().part(field, part))
    }
}

fn transport_error(err: reqwest::Error) -> GatewayError {
    GatewayError::Transport(err.to_string())
}

fn with_position(form: Form, position: Vec3) -> Form {
    form.text("x", position.x.to_string())
        .text("y", position.y.to_string())
        .text("z", position.z.to_string())
}

impl InventoryGateway for HttpInventoryGateway {
    fn list_inventory(&self) -> GatewayResult<Vec<InventoryRecord>> {
        let body = self.send(self.client.get(self.endpoint(ROOMS_ENDPOINT)))?;
        let records = parse_rooms(&body)?;
        debug!("Fetched {} inventory records", records.len());
        Ok(records)
    }

    fn create_text(&self, text: &str) -> GatewayResult<CreatedRecord> {
        let request = self
            .client
            .post(self.create_endpoint("text"))
            .json(&serde_json::json!({ "text": text }));
        parse_created(&self.send(request)?)
    }

    fn create_image(&self, image: &MediaPayload, position: Vec3) -> GatewayResult<CreatedRecord> {
        let form = with_position(Self::media_form(IMAGE_FIELD, image)?, position);
        let request = self.client.post(self.create_endpoint("image")).multipart(form);
        parse_created(&self.send(request)?)
    }

    fn create_audio(&self, audio: &MediaPayload) -> GatewayResult<CreatedRecord> {
        let form = Self::media_form(AUDIO_FIELD, audio)?;
        let request = self.client.post(self.create_endpoint("audio")).multipart(form);
        parse_created(&self.send(request)?)
    }

    fn update_text(&self, id: RecordId, text: &str) -> GatewayResult<UpdateReceipt> {
        let request = self
            .client
            .post(self.update_endpoint(id, "text"))
            .json(&serde_json::json!({ "text": text }));
        Ok(parse_update(&self.send(request)?))
    }

    fn update_image(
        &self,
        id: RecordId,
        image: &MediaPayload,
        position: Option<Vec3>,
    ) -> GatewayResult<UpdateReceipt> {
        let mut form = Self::media_form(IMAGE_FIELD, image)?;
        if let Some(position) = position {
            form = with_position(form, position);
        }
        let request = self.client.post(self.update_endpoint(id, "image")).multipart(form);
        Ok(parse_update(&self.send(request)?))
    }

    fn update_audio(&self, id: RecordId, audio: &MediaPayload) -> GatewayResult<UpdateReceipt> {
        let form = Self::media_form(AUDIO_FIELD, audio)?;
        let request = self.client.post(self.update_endpoint(id, "audio")).multipart(form);
        Ok(parse_update(&self.send(request)?))
    }
}
