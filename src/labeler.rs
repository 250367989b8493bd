use async_trait::async_trait;
use std::path::Path;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LabelError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("model error: {0}")]
    Model(String),
}

/// External multimodal collaborator: given an image, produce a short text
/// label. Implementations are used strictly sequentially; `&mut self` keeps
/// two labeling calls from ever being in flight against the same backend.
#[async_trait]
pub trait ImageLabeler: Send {
    async fn label_image(&mut self, path: &Path) -> Result<String, LabelError>;

    /// Clear per-image inference state. Called before every request in a
    /// batch; stateless backends leave the default no-op.
    fn reset(&mut self) {}
}

/// Borrow of a labeler for the duration of one batch. Every request goes
/// through `label`, which resets the backend first, so cached state from the
/// previous image can never leak into the next inference.
pub struct LabelBatch<'a> {
    labeler: &'a mut dyn ImageLabeler,
}

impl<'a> LabelBatch<'a> {
    pub fn new(labeler: &'a mut dyn ImageLabeler) -> Self {
        Self { labeler }
    }

    pub async fn label(&mut self, path: &Path) -> Result<String, LabelError> {
        self.labeler.reset();
        self.labeler.label_image(path).await
    }
}

#[cfg(test)]
pub mod testing {
    use super::*;
    use std::collections::VecDeque;

    /// Scripted labeler for dispatcher tests. Records reset ordering so the
    /// sequential contract stays observable.
    pub struct ScriptedLabeler {
        responses: VecDeque<Result<String, LabelError>>,
        pub resets: usize,
        pub calls: usize,
    }

    impl ScriptedLabeler {
        pub fn new(responses: Vec<Result<String, LabelError>>) -> Self {
            Self {
                responses: responses.into(),
                resets: 0,
                calls: 0,
            }
        }
    }

    #[async_trait]
    impl ImageLabeler for ScriptedLabeler {
        async fn label_image(&mut self, _path: &Path) -> Result<String, LabelError> {
            self.calls += 1;
            self.responses
                .pop_front()
                .unwrap_or(Ok("unscripted".to_string()))
        }

        fn reset(&mut self) {
            self.resets += 1;
        }
    }

    #[tokio::test]
    async fn batch_resets_before_every_call() {
        let mut labeler = ScriptedLabeler::new(vec![
            Ok("beach".to_string()),
            Ok("mountain".to_string()),
        ]);
        {
            let mut batch = LabelBatch::new(&mut labeler);
            batch.label(Path::new("/a.jpg")).await.unwrap();
            batch.label(Path::new("/b.jpg")).await.unwrap();
        }
        assert_eq!(labeler.resets, 2);
        assert_eq!(labeler.calls, 2);
    }
}
