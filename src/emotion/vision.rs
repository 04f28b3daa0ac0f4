//! Face detection and emotion classification.
//!
//! Both models are black boxes behind [`FaceDetector`] and
//! [`EmotionClassifier`]. The shipped implementation, [`SidecarVision`],
//! runs an external vision command against the configured model artifact:
//!
//! ```text
//! <command> detect   --model <artifact>   PNG frame on stdin -> [{"x":..,"y":..,"width":..,"height":..}]
//! <command> classify --model <artifact>   PNG face on stdin  -> {"emotion":"happy","confidence":0.93}
//! ```

use anyhow::{anyhow, bail, Context, Result};
use image::RgbImage;
use std::io::Write;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::config::EmotionConfig;

use super::error::EmotionError;
use super::frame::{crop_face, encode_png};
use super::types::{Classification, FaceBox, FaceReading};

pub trait FaceDetector: Send + Sync {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<FaceBox>>;
}

pub trait EmotionClassifier: Send + Sync {
    fn classify(&self, face: &RgbImage) -> Result<Classification>;
}

/// A detector and classifier pair, cheap to clone.
#[derive(Clone)]
pub struct VisionModels {
    detector: Arc<dyn FaceDetector>,
    classifier: Arc<dyn EmotionClassifier>,
}

impl VisionModels {
    pub fn new(detector: Arc<dyn FaceDetector>, classifier: Arc<dyn EmotionClassifier>) -> Self {
        Self {
            detector,
            classifier,
        }
    }

    /// Load the sidecar models, checking the artifact and command exist.
    pub fn load(config: &EmotionConfig) -> Result<Self> {
        let model_path = config.resolved_model_path()?;
        if !model_path.exists() {
            bail!("Emotion model file not found at {}", model_path.display());
        }

        let command = which::which(&config.vision_command).map_err(|_| {
            anyhow!(
                "Vision command '{}' not found in PATH",
                config.vision_command
            )
        })?;

        info!(
            "Loaded emotion models from {} using {}",
            model_path.display(),
            command.display()
        );

        let sidecar = Arc::new(SidecarVision::new(command, model_path));
        Ok(Self::new(sidecar.clone(), sidecar))
    }

    /// Detect every face in the frame and classify each crop.
    pub fn read_faces(&self, frame: &RgbImage) -> Result<Vec<FaceReading>> {
        let faces = self.detector.detect(frame).context("Face detection failed")?;

        let mut readings = Vec::with_capacity(faces.len());
        for face in faces {
            let Some(clamped) = face.clamp_to(frame.width(), frame.height()) else {
                debug!("Skipping face outside the frame: {:?}", face);
                continue;
            };
            let Some(crop) = crop_face(frame, &clamped) else {
                continue;
            };

            let classification = self
                .classifier
                .classify(&crop)
                .context("Emotion classification failed")?;

            readings.push(FaceReading {
                face: clamped,
                emotion: classification.emotion.trim().to_lowercase(),
                confidence: if classification.confidence.is_finite() {
                    classification.confidence.clamp(0.0, 1.0)
                } else {
                    0.0
                },
            });
        }

        Ok(readings)
    }
}

/// Models loaded at startup, or the reason they are unavailable.
///
/// A missing model does not stop the service; emotion requests fail instead.
#[derive(Clone)]
pub enum VisionHandle {
    Ready(VisionModels),
    Unavailable(String),
}

impl VisionHandle {
    pub fn load(config: &EmotionConfig) -> Self {
        match VisionModels::load(config) {
            Ok(models) => Self::Ready(models),
            Err(e) => {
                warn!("Emotion analysis unavailable: {:#}", e);
                Self::Unavailable(format!("{:#}", e))
            }
        }
    }

    pub fn models(&self) -> Result<&VisionModels, EmotionError> {
        match self {
            Self::Ready(models) => Ok(models),
            Self::Unavailable(reason) => Err(EmotionError::ModelUnavailable(reason.clone())),
        }
    }

    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Runs the vision command once per request.
pub struct SidecarVision {
    command: PathBuf,
    model_path: PathBuf,
}

impl SidecarVision {
    pub fn new(command: PathBuf, model_path: PathBuf) -> Self {
        Self {
            command,
            model_path,
        }
    }

    fn run(&self, action: &str, image: &RgbImage) -> Result<String> {
        let input = encode_png(image)?;

        let mut child = Command::new(&self.command)
            .arg(action)
            .arg("--model")
            .arg(&self.model_path)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .with_context(|| format!("Failed to start vision command {:?}", self.command))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(&input)
                .context("Failed to send image to vision command")?;
        }

        let output = child
            .wait_with_output()
            .context("Failed to wait for vision command")?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            bail!("Vision command '{}' failed: {}", action, stderr.trim());
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }
}

impl FaceDetector for SidecarVision {
    fn detect(&self, frame: &RgbImage) -> Result<Vec<FaceBox>> {
        let stdout = self.run("detect", frame)?;
        serde_json::from_str(stdout.trim()).context("Vision command returned invalid face list")
    }
}

impl EmotionClassifier for SidecarVision {
    fn classify(&self, face: &RgbImage) -> Result<Classification> {
        let stdout = self.run("classify", face)?;
        serde_json::from_str(stdout.trim())
            .context("Vision command returned invalid classification")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    struct FixedDetector(Vec<FaceBox>);

    impl FaceDetector for FixedDetector {
        fn detect(&self, _frame: &RgbImage) -> Result<Vec<FaceBox>> {
            Ok(self.0.clone())
        }
    }

    /// Labels each crop by its width and remembers the sizes it saw.
    #[derive(Default)]
    struct SizeClassifier {
        seen: Mutex<Vec<(u32, u32)>>,
    }

    impl EmotionClassifier for SizeClassifier {
        fn classify(&self, face: &RgbImage) -> Result<Classification> {
            self.seen.lock().unwrap().push(face.dimensions());
            Ok(Classification {
                emotion: (if face.width() > 50 { " Happy" } else { "sad" }).to_string(),
                confidence: 1.4,
            })
        }
    }

    struct FailingClassifier;

    impl EmotionClassifier for FailingClassifier {
        fn classify(&self, _face: &RgbImage) -> Result<Classification> {
            bail!("model crashed")
        }
    }

    struct NanClassifier;

    impl EmotionClassifier for NanClassifier {
        fn classify(&self, _face: &RgbImage) -> Result<Classification> {
            Ok(Classification {
                emotion: "angry".to_string(),
                confidence: f32::NAN,
            })
        }
    }

    #[test]
    fn test_non_finite_confidence_reads_as_zero() {
        let models = VisionModels::new(
            Arc::new(FixedDetector(vec![FaceBox::new(0, 0, 60, 60)])),
            Arc::new(NanClassifier),
        );

        let readings = models.read_faces(&RgbImage::new(100, 100)).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].confidence, 0.0);
    }

    #[test]
    fn test_read_faces_classifies_each_crop() {
        let classifier = Arc::new(SizeClassifier::default());
        let models = VisionModels::new(
            Arc::new(FixedDetector(vec![
                FaceBox::new(0, 0, 60, 60),
                FaceBox::new(100, 10, 40, 40),
            ])),
            classifier.clone(),
        );

        let readings = models.read_faces(&RgbImage::new(200, 100)).unwrap();
        assert_eq!(readings.len(), 2);
        assert_eq!(readings[0].emotion, "happy");
        assert_eq!(readings[0].confidence, 1.0);
        assert_eq!(readings[1].emotion, "sad");
        assert_eq!(*classifier.seen.lock().unwrap(), vec![(60, 60), (40, 40)]);
    }

    #[test]
    fn test_read_faces_skips_boxes_outside_frame() {
        let models = VisionModels::new(
            Arc::new(FixedDetector(vec![
                FaceBox::new(500, 500, 60, 60),
                FaceBox::new(180, 0, 60, 60),
            ])),
            Arc::new(SizeClassifier::default()),
        );

        let readings = models.read_faces(&RgbImage::new(200, 100)).unwrap();
        assert_eq!(readings.len(), 1);
        assert_eq!(readings[0].face, FaceBox::new(180, 0, 20, 60));
    }

    #[test]
    fn test_classifier_failure_propagates() {
        let models = VisionModels::new(
            Arc::new(FixedDetector(vec![FaceBox::new(0, 0, 60, 60)])),
            Arc::new(FailingClassifier),
        );
        let err = models.read_faces(&RgbImage::new(100, 100)).unwrap_err();
        assert!(format!("{:#}", err).contains("model crashed"));
    }

    #[test]
    fn test_handle_reports_missing_model() {
        let dir = tempfile::tempdir().unwrap();
        let config = EmotionConfig {
            model_path: Some(dir.path().join("missing.onnx").display().to_string()),
            ..EmotionConfig::default()
        };

        let handle = VisionHandle::load(&config);
        assert!(!handle.is_ready());
        match handle.models() {
            Err(EmotionError::ModelUnavailable(reason)) => {
                assert!(reason.contains("Emotion model file not found"))
            }
            _ => panic!("expected ModelUnavailable"),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_sidecar_protocol() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let script = dir.path().join("vision");
        std::fs::write(
            &script,
            "#!/bin/sh\n\
             cat > /dev/null\n\
             case \"$1\" in\n\
               detect) echo '[{\"x\":2,\"y\":3,\"width\":50,\"height\":40}]' ;;\n\
               classify) echo '{\"emotion\":\"surprise\",\"confidence\":0.75}' ;;\n\
               *) echo \"unknown action\" >&2; exit 2 ;;\n\
             esac\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();

        let model = dir.path().join("model.onnx");
        std::fs::write(&model, b"weights").unwrap();

        let sidecar = Arc::new(SidecarVision::new(script, model));
        let models = VisionModels::new(sidecar.clone(), sidecar);

        let readings = models.read_faces(&RgbImage::new(100, 100)).unwrap();
        assert_eq!(
            readings,
            vec![FaceReading {
                face: FaceBox::new(2, 3, 50, 40),
                emotion: "surprise".to_string(),
                confidence: 0.75,
            }]
        );
    }
}
