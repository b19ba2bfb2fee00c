use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor, TensorData};
use ndarray::{Array2, Array4, ArrayView2};

use super::PrototypeModel;
use crate::error::{VizError, VizResult};

/// Prototype state read from the model at the start of a render cycle.
#[derive(Debug, Clone)]
pub struct ModelSnapshot {
    pub prototypes: Array2<f64>,
    pub labels: Option<Vec<i64>>,
}

impl ModelSnapshot {
    pub fn capture<B, M>(model: &M) -> VizResult<Self>
    where
        B: Backend,
        M: PrototypeModel<B> + ?Sized,
    {
        let prototypes = tensor2_to_array(model.prototypes())?;
        let labels = model
            .prototype_labels()
            .map(int_tensor_to_vec)
            .transpose()?;
        if let Some(labels) = &labels
            && labels.len() != prototypes.nrows()
        {
            return Err(VizError::Shape(format!(
                "model reports {} prototype labels for {} prototypes",
                labels.len(),
                prototypes.nrows()
            )));
        }
        Ok(Self { prototypes, labels })
    }
}

pub fn tensor2_to_array<B: Backend>(tensor: Tensor<B, 2>) -> VizResult<Array2<f64>> {
    let [rows, cols] = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f64>()
        .into_vec::<f64>()
        .map_err(|err| VizError::Tensor(format!("{err:?}")))?;
    Array2::from_shape_vec((rows, cols), values).map_err(|err| VizError::Tensor(err.to_string()))
}

pub fn tensor4_to_array<B: Backend>(tensor: Tensor<B, 4>) -> VizResult<Array4<f32>> {
    let [n, a, b, c] = tensor.dims();
    let values = tensor
        .into_data()
        .convert::<f32>()
        .into_vec::<f32>()
        .map_err(|err| VizError::Tensor(format!("{err:?}")))?;
    Array4::from_shape_vec((n, a, b, c), values).map_err(|err| VizError::Tensor(err.to_string()))
}

pub fn int_tensor_to_vec<B: Backend>(tensor: Tensor<B, 1, Int>) -> VizResult<Vec<i64>> {
    tensor
        .into_data()
        .convert::<i64>()
        .into_vec::<i64>()
        .map_err(|err| VizError::Tensor(format!("{err:?}")))
}

pub fn array2_to_tensor<B: Backend>(values: ArrayView2<'_, f64>, device: &B::Device) -> Tensor<B, 2> {
    let (rows, cols) = values.dim();
    let data: Vec<f32> = values.iter().map(|v| *v as f32).collect();
    Tensor::from_data(TensorData::new(data, [rows, cols]), device)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;
    use ndarray::array;

    type TestBackend = NdArray<f32>;

    #[test]
    fn host_conversion_preserves_layout() {
        let device = Default::default();
        let host = array![[1.0, 2.0, 3.0], [4.0, 5.0, 6.0]];
        let tensor = array2_to_tensor::<TestBackend>(host.view(), &device);
        assert_eq!(tensor.dims(), [2, 3]);
        let back = tensor2_to_array(tensor).expect("to host");
        assert_eq!(back, host);
    }

    #[test]
    fn int_labels_convert_to_i64() {
        let device = Default::default();
        let labels =
            Tensor::<TestBackend, 1, Int>::from_data(TensorData::new(vec![3i64, 1, 2], [3]), &device);
        assert_eq!(int_tensor_to_vec(labels).expect("labels"), vec![3, 1, 2]);
    }
}
