mod snapshot;

pub use snapshot::{
    ModelSnapshot, array2_to_tensor, int_tensor_to_vec, tensor2_to_array, tensor4_to_array,
};

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

/// What a visualization needs to read from a prototype classifier.
///
/// Only `prototypes`, `prototype_labels` and `predict` are required; variants
/// that need more (topology, image components, a learned mapping) fail their
/// render cycle with a shape error when the model returns `None`.
pub trait PrototypeModel<B: Backend> {
    /// One row per prototype (or component) in input space.
    fn prototypes(&self) -> Tensor<B, 2>;

    fn prototype_labels(&self) -> Option<Tensor<B, 1, Int>>;

    /// Class label per input row.
    fn predict(&self, inputs: Tensor<B, 2>) -> Tensor<B, 1, Int>;

    /// Square prototype adjacency; finite non-zero entries are edges.
    fn topology(&self) -> Option<Tensor<B, 2>> {
        None
    }

    /// Learned components as `[N, C, H, W]` or `[N, H, W, C]` images.
    fn components(&self) -> Option<Tensor<B, 4>> {
        None
    }

    /// Map inputs into the learned 2-D representation space.
    fn map_representation(&self, _inputs: Tensor<B, 2>) -> Option<Tensor<B, 2>> {
        None
    }

    /// Classify points that already live in representation space.
    /// `map_protos` says whether prototypes should be compared after mapping.
    fn predict_latent(&self, latent: Tensor<B, 2>, _map_protos: bool) -> Tensor<B, 1, Int> {
        self.predict(latent)
    }
}
