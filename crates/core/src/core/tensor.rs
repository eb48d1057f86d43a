//! Dense f32 buffers handed to the network driver.

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Tensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Tensor {
    pub fn zeros(shape: &[usize]) -> Self {
        let n = shape.iter().product();
        Self {
            shape: shape.to_vec(),
            values: vec![0.0; n],
        }
    }

    pub fn from_values(shape: &[usize], values: Vec<f32>) -> Option<Self> {
        if shape.iter().product::<usize>() != values.len() {
            return None;
        }
        Some(Self {
            shape: shape.to_vec(),
            values,
        })
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn set_zero(&mut self) {
        self.values.iter_mut().for_each(|v| *v = 0.0);
    }

    /// Set a single unit to 1. Out-of-range indices are ignored.
    pub fn set_on(&mut self, i: usize) {
        if let Some(v) = self.values.get_mut(i) {
            *v = 1.0;
        }
    }

    /// Indices with value above `threshold`.
    pub fn active(&self, threshold: f32) -> Vec<usize> {
        self.values
            .iter()
            .enumerate()
            .filter(|(_, &v)| v > threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shape_and_values_agree() {
        let t = Tensor::zeros(&[2, 3]);
        assert_eq!(t.len(), 6);
        assert!(Tensor::from_values(&[2, 2], vec![0.0; 3]).is_none());
        assert!(Tensor::from_values(&[2, 2], vec![0.0; 4]).is_some());
    }

    #[test]
    fn set_on_and_active() {
        let mut t = Tensor::zeros(&[5]);
        t.set_on(1);
        t.set_on(4);
        t.set_on(99);
        assert_eq!(t.active(0.5), vec![1, 4]);
        t.set_zero();
        assert!(t.active(0.5).is_empty());
    }
}
