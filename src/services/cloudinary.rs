use reqwest::multipart;
use serde_json::Value;
use std::env;

use crate::errors::{AppError, Result};

// Admission documents (passport photographs, transcripts, certificates)
// are kept on Cloudinary; only the resulting URL is stored on the
// application document.
#[derive(Clone)]
pub struct CloudinaryService {
    cloud_name: String,
    api_key: String,
    api_secret: String,
}

impl CloudinaryService {
    pub fn from_env() -> Result<Self> {
        let cloud_name = env::var("CLOUDINARY_CLOUD_NAME")
            .map_err(|_| AppError::cloudinary("CLOUDINARY_CLOUD_NAME not set"))?;

        let api_key = env::var("CLOUDINARY_API_KEY")
            .map_err(|_| AppError::cloudinary("CLOUDINARY_API_KEY not set"))?;

        let api_secret = env::var("CLOUDINARY_API_SECRET")
            .map_err(|_| AppError::cloudinary("CLOUDINARY_API_SECRET not set"))?;

        Ok(Self {
            cloud_name,
            api_key,
            api_secret,
        })
    }

    /// Signed upload. `auto` lets Cloudinary handle both images and PDFs.
    pub async fn upload_document(
        &self,
        data: &[u8],
        file_name: &str,
        public_id: &str,
    ) -> Result<String> {
        let folder = "admissions";
        let timestamp = chrono::Utc::now().timestamp().to_string();

        // Signature covers the parameters in alphabetical order
        let signature_data = format!(
            "folder={}&public_id={}&timestamp={}{}",
            folder, public_id, timestamp, self.api_secret
        );
        let signature = format!("{:x}", md5::compute(signature_data));

        let upload_url = format!(
            "https://api.cloudinary.com/v1_1/{}/auto/upload",
            self.cloud_name
        );

        let form = multipart::Form::new()
            .text("api_key", self.api_key.clone())
            .text("timestamp", timestamp)
            .text("signature", signature)
            .text("folder", folder.to_string())
            .text("public_id", public_id.to_string())
            .part(
                "file",
                multipart::Part::bytes(data.to_vec())
                    .file_name(file_name.to_string())
                    .mime_str("application/octet-stream")
                    .map_err(|e| AppError::cloudinary(e.to_string()))?,
            );

        let client = reqwest::Client::new();
        let response = client
            .post(&upload_url)
            .multipart(form)
            .send()
            .await
            .map_err(|e| AppError::cloudinary(format!("Upload failed: {}", e)))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(AppError::cloudinary(format!(
                "Cloudinary API error: {}",
                error_text
            )));
        }

        let result: Value = response
            .json()
            .await
            .map_err(|e| AppError::cloudinary(format!("Failed to parse response: {}", e)))?;

        if let Some(error) = result.get("error") {
            let error_msg = error["message"].as_str().unwrap_or("Unknown Cloudinary error");
            return Err(AppError::cloudinary(error_msg.to_string()));
        }

        let secure_url = result["secure_url"]
            .as_str()
            .ok_or_else(|| AppError::cloudinary("No secure URL in response"))?
            .to_string();

        Ok(secure_url)
    }
}
