//! Camera: publishes one of its configured images on every tick.

use std::path::PathBuf;

use rand::Rng;

use super::Tick;
use crate::error::ConfigurationError;

/// A camera cycling randomly through a set of image files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Camera {
    images: Vec<PathBuf>,
}

impl Camera {
    #[must_use]
    pub fn new<P: Into<PathBuf>>(images: impl IntoIterator<Item = P>) -> Self {
        Self {
            images: images.into_iter().map(Into::into).collect(),
        }
    }

    #[must_use]
    pub fn images(&self) -> &[PathBuf] {
        &self.images
    }

    pub(super) fn tick<R: Rng + ?Sized>(&self, rng: &mut R) -> Tick {
        let path = super::pick(&self.images, rng)
            .map(|(_, path)| path.clone())
            .unwrap_or_default();
        Tick::Image(path)
    }

    pub(super) fn validate(&self, name: &str) -> Result<(), ConfigurationError> {
        if self.images.is_empty() {
            return Err(ConfigurationError::EmptyImages {
                name: name.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn should_pick_one_of_configured_images() {
        let camera = Camera::new(["a.jpg", "b.jpg"]);
        let mut rng = StdRng::seed_from_u64(2);
        for _ in 0..20 {
            let Tick::Image(path) = camera.tick(&mut rng) else {
                panic!("camera ticks an image");
            };
            assert!(camera.images().contains(&path));
        }
    }

    #[test]
    fn should_reject_empty_image_list() {
        let camera = Camera::new(Vec::<PathBuf>::new());
        assert!(matches!(
            camera.validate("Porch"),
            Err(ConfigurationError::EmptyImages { .. })
        ));
    }
}
