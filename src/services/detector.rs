// src/services/detector.rs
use crate::config::{ModelEndpoint, Settings};
use crate::errors::GatewayError;
use crate::models::Modality;
use base64::{Engine as _, engine::general_purpose};
use log::{debug, error};
use reqwest::Client;
use std::path::{Path, PathBuf};
use uuid::Uuid;

const ALLOWED_EXTENSIONS: [&str; 4] = ["png", "jpg", "jpeg", "gif"];

/// Forwards uploaded scans to the hosted detection provider. One service
/// instance carries the credential table for all three modalities; routing is
/// a static lookup.
pub struct DetectorService {
    client: Client,
    api_url: String,
    upload_dir: PathBuf,
    brain: ModelEndpoint,
    lung: ModelEndpoint,
    fracture: ModelEndpoint,
}

/// Checks the declared filename against the extension allow-list
/// (case-insensitive suffix match; a name without a dot never passes).
pub fn allowed_file(filename: &str) -> bool {
    filename
        .rsplit_once('.')
        .map(|(_, ext)| ALLOWED_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false)
}

/// A transient upload on disk. The file exists for exactly the lifetime of
/// this guard: dropping it removes the file, best-effort, on success and
/// failure paths alike.
pub struct TempUpload {
    path: PathBuf,
}

impl TempUpload {
    pub fn create(upload_dir: &Path, data: &[u8]) -> Result<Self, GatewayError> {
        let path = upload_dir.join(format!("temp_{}.png", Uuid::new_v4().simple()));
        std::fs::write(&path, data)?;
        debug!("File saved to {}", path.display());
        Ok(Self { path })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Drop for TempUpload {
    fn drop(&mut self) {
        if std::fs::remove_file(&self.path).is_ok() {
            debug!("Deleted temp file: {}", self.path.display());
        }
    }
}

impl DetectorService {
    pub fn new(settings: &Settings) -> Self {
        Self {
            client: Client::new(),
            api_url: settings.inference_api_url.clone(),
            upload_dir: settings.upload_dir.clone(),
            brain: settings.brain.clone(),
            lung: settings.lung.clone(),
            fracture: settings.fracture.clone(),
        }
    }

    fn endpoint(&self, modality: Modality) -> &ModelEndpoint {
        match modality {
            Modality::Brain => &self.brain,
            Modality::Lung => &self.lung,
            Modality::Fracture => &self.fracture,
        }
    }

    /// Validates the upload, stages it as a transient file, runs it through
    /// the detection model for `modality`, and returns the provider's JSON
    /// verbatim. The transient file is gone by the time this returns.
    pub async fn detect(
        &self,
        filename: &str,
        data: &[u8],
        modality: Modality,
    ) -> Result<serde_json::Value, GatewayError> {
        if filename.is_empty() || data.is_empty() {
            return Err(GatewayError::Validation("No file provided".to_string()));
        }
        if !allowed_file(filename) {
            return Err(GatewayError::Validation(
                "File type not allowed. Please upload an image (PNG, JPG, JPEG, GIF).".to_string(),
            ));
        }

        let temp = TempUpload::create(&self.upload_dir, data)
            .map_err(|e| GatewayError::Provider(format!("Processing failed: {e}")))?;

        self.infer(temp.path(), modality).await.map_err(|e| {
            error!("Inference failed for {modality}: {e}");
            GatewayError::Provider(format!("Processing failed: {e}"))
        })
    }

    /// Hosted-inference wire format: the image is posted base64-encoded to
    /// `{api_url}/{model_id}?api_key={key}`.
    async fn infer(&self, path: &Path, modality: Modality) -> Result<serde_json::Value, String> {
        let endpoint = self.endpoint(modality);
        let image = std::fs::read(path).map_err(|e| e.to_string())?;
        let body = general_purpose::STANDARD.encode(image);

        let response = self
            .client
            .post(format!("{}/{}", self.api_url, endpoint.model_id))
            .query(&[("api_key", endpoint.api_key.as_str())])
            .header("Content-Type", "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| format!("inference request failed: {e}"))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(format!("inference provider returned {status}: {error_text}"));
        }

        let result: serde_json::Value = response
            .json()
            .await
            .map_err(|e| format!("invalid inference response: {e}"))?;

        debug!("Raw result from detector: {result}");
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scratch_dir() -> PathBuf {
        let dir = std::env::temp_dir().join(format!("medgate-test-{}", Uuid::new_v4().simple()));
        std::fs::create_dir_all(&dir).unwrap();
        dir
    }

    fn test_service(upload_dir: &Path) -> DetectorService {
        let endpoint = ModelEndpoint {
            api_key: "test-key".to_string(),
            model_id: "test-model/1".to_string(),
        };
        DetectorService {
            client: Client::new(),
            // Unroutable address: any test reaching the network fails fast.
            api_url: "http://127.0.0.1:1".to_string(),
            upload_dir: upload_dir.to_path_buf(),
            brain: endpoint.clone(),
            lung: endpoint.clone(),
            fracture: endpoint,
        }
    }

    #[test]
    fn extension_allow_list() {
        assert!(allowed_file("scan.png"));
        assert!(allowed_file("scan.jpg"));
        assert!(allowed_file("scan.jpeg"));
        assert!(allowed_file("scan.gif"));
        assert!(allowed_file("SCAN.PNG"));
        assert!(allowed_file("multi.part.name.JpEg"));
        assert!(!allowed_file("scan.pdf"));
        assert!(!allowed_file("scan.png.exe"));
        assert!(!allowed_file("noextension"));
        assert!(!allowed_file(""));
    }

    #[test]
    fn temp_upload_removed_on_drop() {
        let dir = scratch_dir();
        let path = {
            let temp = TempUpload::create(&dir, b"fake image bytes").unwrap();
            assert!(temp.path().exists());
            temp.path().to_path_buf()
        };
        assert!(!path.exists());
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn temp_upload_tolerates_already_deleted_file() {
        let dir = scratch_dir();
        let temp = TempUpload::create(&dir, b"bytes").unwrap();
        std::fs::remove_file(temp.path()).unwrap();
        drop(temp); // must not panic
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn rejected_extension_makes_no_call_and_writes_no_file() {
        let dir = scratch_dir();
        let service = test_service(&dir);

        let err = service
            .detect("report.pdf", b"not an image", Modality::Brain)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));

        // No transient file was ever staged.
        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn empty_upload_is_rejected() {
        let dir = scratch_dir();
        let service = test_service(&dir);

        let err = service.detect("scan.png", b"", Modality::Lung).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[tokio::test]
    async fn temp_file_is_removed_even_when_inference_fails() {
        let dir = scratch_dir();
        let service = test_service(&dir);

        // The provider address is unroutable, so inference fails after the
        // transient file has been written.
        let err = service
            .detect("scan.png", b"fake image bytes", Modality::Fracture)
            .await
            .unwrap_err();
        assert!(matches!(err, GatewayError::Provider(_)));

        assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);
        std::fs::remove_dir_all(&dir).unwrap();
    }
}
