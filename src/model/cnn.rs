//! CNN Model Architecture for CIFAR-10 Classification
//!
//! This module implements a small convolutional network using the Burn framework.
//! Three stages of two 3x3 convolutions each, with ReLU and batch normalization
//! after every convolution and a 2x2 max-pool closing each stage, feed a
//! two-layer classifier head.

use burn::{
    config::Config,
    module::Module,
    nn::{
        conv::{Conv2d, Conv2dConfig},
        pool::{MaxPool2d, MaxPool2dConfig},
        BatchNorm, BatchNormConfig, Dropout, DropoutConfig, Linear, LinearConfig, PaddingConfig2d,
        Relu,
    },
    tensor::{backend::Backend, Tensor},
};

use crate::utils::error::{self, CifarError};

/// Configuration for the CifarNet CNN model
#[derive(Config, Debug)]
pub struct CifarNetConfig {
    /// Number of output classes
    #[config(default = "10")]
    pub num_classes: usize,

    /// Number of input channels (3 for RGB)
    #[config(default = "3")]
    pub in_channels: usize,

    /// Input image size (assumes square images)
    #[config(default = "32")]
    pub image_size: usize,

    /// Output channels of the three convolutional stages
    #[config(default = "[9, 18, 36]")]
    pub channels: [usize; 3],

    /// Width of the hidden linear layer
    #[config(default = "100")]
    pub hidden: usize,

    /// Dropout rate applied before the output layer
    #[config(default = "0.5")]
    pub dropout: f64,

    /// Normalize both convolutions of a stage with the same BatchNorm layer
    #[config(default = "true")]
    pub shared_stage_norm: bool,
}

impl CifarNetConfig {
    /// Spatial size after the three max-pool layers
    pub fn feature_map_size(&self) -> usize {
        self.image_size / 8
    }

    /// Number of features entering the classifier head (576 for the defaults)
    pub fn flattened_features(&self) -> usize {
        let size = self.feature_map_size();
        self.channels[2] * size * size
    }

    /// Validate the configuration
    pub fn validate(&self) -> error::Result<()> {
        if self.num_classes == 0 {
            return Err(CifarError::Config("num_classes must be greater than 0".to_string()));
        }
        if self.in_channels == 0 || self.hidden == 0 || self.channels.contains(&0) {
            return Err(CifarError::Config(
                "channel and hidden sizes must be greater than 0".to_string(),
            ));
        }
        if self.image_size < 8 || self.image_size % 8 != 0 {
            return Err(CifarError::Config(format!(
                "image_size must be a positive multiple of 8, got {}",
                self.image_size
            )));
        }
        if !(0.0..1.0).contains(&self.dropout) {
            return Err(CifarError::Config("dropout must be in range [0.0, 1.0)".to_string()));
        }
        Ok(())
    }

    /// Reject batches whose layout differs from `[_, in_channels, image_size, image_size]`
    pub fn check_input(&self, dims: [usize; 4]) -> error::Result<()> {
        check_dims(self.in_channels, self.image_size, dims)
    }

    /// Initialize a model with this configuration
    pub fn init<B: Backend>(&self, device: &B::Device) -> CifarNet<B> {
        let [c1, c2, c3] = self.channels;

        let stage1 = ConvStage::new(self.in_channels, c1, self.shared_stage_norm, device);
        let stage2 = ConvStage::new(c1, c2, self.shared_stage_norm, device);
        let stage3 = ConvStage::new(c2, c3, self.shared_stage_norm, device);

        let fc1 = LinearConfig::new(self.flattened_features(), self.hidden).init(device);
        let dropout = DropoutConfig::new(self.dropout).init();
        let fc2 = LinearConfig::new(self.hidden, self.num_classes).init(device);

        CifarNet {
            stage1,
            stage2,
            stage3,
            fc1,
            dropout,
            fc2,
            relu: Relu::new(),
            in_channels: self.in_channels,
            image_size: self.image_size,
        }
    }
}

fn check_dims(channels: usize, size: usize, dims: [usize; 4]) -> error::Result<()> {
    let [_, c, h, w] = dims;
    if c != channels || h != size || w != size {
        return Err(CifarError::ShapeMismatch {
            expected_channels: channels,
            expected_size: size,
            actual: dims,
        });
    }
    Ok(())
}

/// Two convolutions, each followed by ReLU and BatchNorm, then a 2x2 max-pool
///
/// With a shared norm, `bn_b` is `None` and `bn_a` normalizes both
/// convolution outputs, so its running statistics see both.
#[derive(Module, Debug)]
pub struct ConvStage<B: Backend> {
    pub conv_a: Conv2d<B>,
    pub bn_a: BatchNorm<B, 2>,
    pub conv_b: Conv2d<B>,
    pub bn_b: Option<BatchNorm<B, 2>>,
    pub pool: MaxPool2d,
    relu: Relu,
}

impl<B: Backend> ConvStage<B> {
    /// Create a new convolutional stage
    pub fn new(
        in_channels: usize,
        out_channels: usize,
        shared_norm: bool,
        device: &B::Device,
    ) -> Self {
        let conv_a = Conv2dConfig::new([in_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);
        let conv_b = Conv2dConfig::new([out_channels, out_channels], [3, 3])
            .with_padding(PaddingConfig2d::Explicit(1, 1))
            .init(device);

        let bn_a = BatchNormConfig::new(out_channels).init(device);
        let bn_b = if shared_norm {
            None
        } else {
            Some(BatchNormConfig::new(out_channels).init(device))
        };

        Self {
            conv_a,
            bn_a,
            conv_b,
            bn_b,
            pool: MaxPool2dConfig::new([2, 2]).with_strides([2, 2]).init(),
            relu: Relu::new(),
        }
    }

    /// Forward pass through the stage: [B, C_in, H, W] -> [B, C_out, H/2, W/2]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 4> {
        let x = self.conv_a.forward(x);
        let x = self.relu.forward(x);
        let x = self.bn_a.forward(x);

        let x = self.conv_b.forward(x);
        let x = self.relu.forward(x);
        let x = match &self.bn_b {
            Some(bn) => bn.forward(x),
            None => self.bn_a.forward(x),
        };

        self.pool.forward(x)
    }

    pub fn has_shared_norm(&self) -> bool {
        self.bn_b.is_none()
    }
}

/// CIFAR-10 Classifier CNN
///
/// Architecture:
/// - 3 convolutional stages (3 -> 9 -> 18 -> 36 channels by default)
/// - Flatten (36 x 4 x 4 = 576 features for 32x32 input)
/// - Linear -> ReLU -> Dropout -> Linear
#[derive(Module, Debug)]
pub struct CifarNet<B: Backend> {
    pub stage1: ConvStage<B>,
    pub stage2: ConvStage<B>,
    pub stage3: ConvStage<B>,

    // Classifier head
    pub fc1: Linear<B>,
    pub dropout: Dropout,
    pub fc2: Linear<B>,
    relu: Relu,

    in_channels: usize,
    image_size: usize,
}

impl<B: Backend> CifarNet<B> {
    /// Forward pass through the network
    ///
    /// # Arguments
    /// * `x` - Input tensor of shape [batch_size, 3, 32, 32]
    ///
    /// # Returns
    /// * Logits tensor of shape [batch_size, num_classes]
    pub fn forward(&self, x: Tensor<B, 4>) -> Tensor<B, 2> {
        let x = self.stage1.forward(x);
        let x = self.stage2.forward(x);
        let x = self.stage3.forward(x);

        // Flatten: [B, C, H, W] -> [B, C * H * W]
        let [batch_size, channels, height, width] = x.dims();
        let x = x.reshape([batch_size, channels * height * width]);

        let x = self.fc1.forward(x);
        let x = self.relu.forward(x);
        let x = self.dropout.forward(x);
        self.fc2.forward(x)
    }

    /// Reject batches whose layout the network cannot consume
    pub fn check_input(&self, dims: [usize; 4]) -> error::Result<()> {
        check_dims(self.in_channels, self.image_size, dims)
    }
}
