//! # Inference models
//!
//! The autonomous pilot drives from the output of an [`InferenceModel`]. The only model provided
//! is the [`CategoricalModel`], a small dense network which classifies the steering angle into
//! bins and regresses the throttle.
//!
//! Models are stored as JSON:
//!
//! ```json
//! {
//!     "input_width": 32,
//!     "input_height": 24,
//!     "angle_bins": 15,
//!     "layers": [
//!         { "weights": [[...], ...], "biases": [...], "activation": "relu" },
//!         { "weights": [[...], ...], "biases": [...], "activation": "linear" }
//!     ]
//! }
//! ```
//!
//! Each layer's `weights` has one row per output. The last layer has `angle_bins + 1` outputs,
//! the angle bin scores followed by the throttle.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use image::imageops::FilterType;
use ndarray::{Array1, Array2};
use serde::Deserialize;
use std::{fs, path::Path};

use super::Command;
use crate::vision::Frame;

// ------------------------------------------------------------------------------------------------
// TRAITS
// ------------------------------------------------------------------------------------------------

/// A model predicting the driving command from a camera frame.
pub trait InferenceModel {
    fn predict(&self, frame: &Frame) -> Result<Command, ModelError>;
}

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Dense network with a categorical steering output and a linear throttle output.
#[derive(Debug, Clone)]
pub struct CategoricalModel {
    input_width: u32,

    input_height: u32,

    angle_bins: usize,

    layers: Vec<DenseLayer>,
}

#[derive(Debug, Clone)]
struct DenseLayer {
    weights: Array2<f64>,

    biases: Array1<f64>,

    activation: Activation,
}

/// On-disk form of the model.
#[derive(Deserialize)]
struct ModelFile {
    input_width: u32,
    input_height: u32,
    angle_bins: usize,
    layers: Vec<LayerFile>,
}

#[derive(Deserialize)]
struct LayerFile {
    weights: Vec<Vec<f64>>,
    biases: Vec<f64>,
    activation: Activation,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
enum Activation {
    Relu,
    Linear,
}

#[derive(Debug, thiserror::Error)]
pub enum ModelError {
    #[error("Could not read the model file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("Could not parse the model: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Invalid model shape: {0}")]
    InvalidShape(String),

    #[error("The model produced a non-finite output")]
    InvalidOutput,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl CategoricalModel {
    /// Load a model from a JSON file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ModelError> {
        let path = path.as_ref();
        let json = fs::read_to_string(path).map_err(|e| ModelError::Io {
            path: path.display().to_string(),
            source: e,
        })?;

        Self::from_json(&json)
    }

    /// Parse a model from a JSON string, checking the layer shapes are consistent.
    pub fn from_json(json: &str) -> Result<Self, ModelError> {
        let file: ModelFile = serde_json::from_str(json)?;

        if file.angle_bins < 2 {
            return Err(ModelError::InvalidShape(format!(
                "at least 2 angle bins are needed, got {}",
                file.angle_bins
            )));
        }

        if file.layers.is_empty() {
            return Err(ModelError::InvalidShape("the model has no layers".into()));
        }

        let mut num_inputs = (file.input_width as usize)
            .checked_mul(file.input_height as usize)
            .filter(|&n| n > 0)
            .ok_or_else(|| {
                ModelError::InvalidShape(format!(
                    "a {}x{} input is not usable",
                    file.input_width, file.input_height
                ))
            })?;
        let mut layers = Vec::with_capacity(file.layers.len());

        for (i, layer) in file.layers.into_iter().enumerate() {
            let num_outputs = layer.weights.len();

            if layer.biases.len() != num_outputs {
                return Err(ModelError::InvalidShape(format!(
                    "layer {} has {} weight rows but {} biases",
                    i,
                    num_outputs,
                    layer.biases.len()
                )));
            }

            if let Some(row) = layer.weights.iter().find(|r| r.len() != num_inputs) {
                return Err(ModelError::InvalidShape(format!(
                    "layer {} expects {} inputs, found a weight row of length {}",
                    i,
                    num_inputs,
                    row.len()
                )));
            }

            let flat: Vec<f64> = layer.weights.into_iter().flatten().collect();
            let weights = Array2::from_shape_vec((num_outputs, num_inputs), flat)
                .map_err(|e| ModelError::InvalidShape(e.to_string()))?;

            layers.push(DenseLayer {
                weights,
                biases: Array1::from(layer.biases),
                activation: layer.activation,
            });

            num_inputs = num_outputs;
        }

        if num_inputs != file.angle_bins + 1 {
            return Err(ModelError::InvalidShape(format!(
                "the last layer must have {} outputs ({} angle bins and the throttle), found {}",
                file.angle_bins + 1,
                file.angle_bins,
                num_inputs
            )));
        }

        Ok(Self {
            input_width: file.input_width,
            input_height: file.input_height,
            angle_bins: file.angle_bins,
            layers,
        })
    }

    /// Size of the image fed to the network as (width, height).
    pub fn input_size(&self) -> (u32, u32) {
        (self.input_width, self.input_height)
    }

    /// Convert a frame into the network's input vector.
    fn preprocess(&self, frame: &Frame) -> Array1<f64> {
        let gray = frame
            .image
            .resize_exact(self.input_width, self.input_height, FilterType::Triangle)
            .to_luma8();

        gray.pixels().map(|p| p[0] as f64 / 255.0).collect()
    }

    fn forward(&self, input: Array1<f64>) -> Array1<f64> {
        self.layers.iter().fold(input, |x, layer| {
            let out = layer.weights.dot(&x) + &layer.biases;
            match layer.activation {
                Activation::Relu => out.mapv(|v| v.max(0.0)),
                Activation::Linear => out,
            }
        })
    }

    /// Map a bin index back onto the `[-1, 1]` steering range.
    fn unbin_angle(&self, bin: usize) -> f64 {
        bin as f64 * 2.0 / (self.angle_bins - 1) as f64 - 1.0
    }
}

impl InferenceModel for CategoricalModel {
    fn predict(&self, frame: &Frame) -> Result<Command, ModelError> {
        let output = self.forward(self.preprocess(frame));

        if output.iter().any(|v| !v.is_finite()) {
            return Err(ModelError::InvalidOutput);
        }

        // First maximum wins on ties
        let mut best_bin = 0;
        for bin in 1..self.angle_bins {
            if output[bin] > output[best_bin] {
                best_bin = bin;
            }
        }

        Ok(Command::new(
            self.unbin_angle(best_bin),
            output[self.angle_bins],
        ))
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::pilot::test_utils::test_frame;
    use image::{DynamicImage, GrayImage, Luma};

    /// A 2x1 input, 3 bin model whose single linear layer reads the left and right pixels.
    ///
    /// Bin 0 (full left) scores the left pixel, bin 2 (full right) the right pixel and bin 1 a
    /// constant 0.5. The throttle is the mean brightness.
    const TWO_PIXEL_MODEL: &str = r#"{
        "input_width": 2,
        "input_height": 1,
        "angle_bins": 3,
        "layers": [
            {
                "weights": [[1.0, 0.0], [0.0, 0.0], [0.0, 1.0], [0.5, 0.5]],
                "biases": [0.0, 0.5, 0.0, 0.0],
                "activation": "linear"
            }
        ]
    }"#;

    fn two_pixel_frame(left: u8, right: u8) -> Frame {
        let mut image = GrayImage::new(2, 1);
        image.put_pixel(0, 0, Luma([left]));
        image.put_pixel(1, 0, Luma([right]));

        Frame {
            image: DynamicImage::ImageLuma8(image),
            ..test_frame()
        }
    }

    #[test]
    fn test_predict_selects_bin() {
        let model = CategoricalModel::from_json(TWO_PIXEL_MODEL).unwrap();
        assert_eq!(model.input_size(), (2, 1));

        let cmd = model.predict(&two_pixel_frame(255, 0)).unwrap();
        assert_eq!(cmd.steering_angle, -1.0);
        assert!((cmd.throttle - 0.5).abs() < 1e-9);

        let cmd = model.predict(&two_pixel_frame(0, 255)).unwrap();
        assert_eq!(cmd.steering_angle, 1.0);

        let cmd = model.predict(&two_pixel_frame(0, 0)).unwrap();
        assert_eq!(cmd.steering_angle, 0.0);
        assert_eq!(cmd.throttle, 0.0);
    }

    #[test]
    fn test_relu_hidden_layer() {
        // The hidden layer negates the pixel so relu zeroes it, leaving only the biases
        let json = r#"{
            "input_width": 1,
            "input_height": 1,
            "angle_bins": 2,
            "layers": [
                { "weights": [[-1.0]], "biases": [0.0], "activation": "relu" },
                { "weights": [[1.0], [0.0], [1.0]], "biases": [0.0, 0.1, 0.3], "activation": "linear" }
            ]
        }"#;
        let model = CategoricalModel::from_json(json).unwrap();

        let cmd = model.predict(&test_frame()).unwrap();
        assert_eq!(cmd.steering_angle, 1.0);
        assert!((cmd.throttle - 0.3).abs() < 1e-9);
    }

    #[test]
    fn test_invalid_shapes_rejected() {
        let wrong_output = TWO_PIXEL_MODEL.replace("\"angle_bins\": 3", "\"angle_bins\": 4");
        assert!(matches!(
            CategoricalModel::from_json(&wrong_output),
            Err(ModelError::InvalidShape(_))
        ));

        let wrong_input = TWO_PIXEL_MODEL.replace("\"input_width\": 2", "\"input_width\": 3");
        assert!(matches!(
            CategoricalModel::from_json(&wrong_input),
            Err(ModelError::InvalidShape(_))
        ));

        assert!(matches!(
            CategoricalModel::from_json("{}"),
            Err(ModelError::ParseError(_))
        ));
    }

    #[test]
    fn test_degenerate_input_size_rejected() {
        let huge = TWO_PIXEL_MODEL
            .replace("\"input_width\": 2", "\"input_width\": 4294967295")
            .replace("\"input_height\": 1", "\"input_height\": 4294967295");
        assert!(matches!(
            CategoricalModel::from_json(&huge),
            Err(ModelError::InvalidShape(_))
        ));

        let empty = TWO_PIXEL_MODEL.replace("\"input_height\": 1", "\"input_height\": 0");
        assert!(matches!(
            CategoricalModel::from_json(&empty),
            Err(ModelError::InvalidShape(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            CategoricalModel::load("/does/not/exist.json"),
            Err(ModelError::Io { .. })
        ));
    }
}
