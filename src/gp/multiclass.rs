//! Multiclass Gaussian Process classification over integer labels.

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, Axis};
use serde::{Deserialize, Serialize};

use crate::config::{MultiClassStrategy, PredictorConfig};
use crate::error::{AnnotatorError, Result};
use crate::gp::binary::BinaryGpClassifier;
use crate::gp::kernel::RbfKernel;

/// Settings shared by every binary GP of a multiclass model.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GpSettings {
    /// Multiclass decomposition.
    pub strategy: MultiClassStrategy,
    /// Kernels tried for each binary GP; the best log-marginal likelihood wins.
    pub candidates: Vec<RbfKernel>,
    /// Newton iterations for the Laplace mode.
    pub max_iter_predict: usize,
}

impl GpSettings {
    /// Derive GP settings from the annotator hyperparameters.
    pub fn from_config(config: &PredictorConfig) -> Self {
        let candidates = if config.optimize {
            RbfKernel::grid(&config.kernel, config.grid_points)
        } else {
            vec![RbfKernel::from_config(&config.kernel)]
        };
        Self {
            strategy: config.multi_class,
            candidates,
            max_iter_predict: config.max_iter_predict,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
enum ClassModel {
    /// Only one class was seen during training.
    Constant,
    /// `classes[1]` against `classes[0]`.
    Binary(BinaryGpClassifier),
    /// One classifier per class, in `classes` order.
    OneVsRest(Vec<BinaryGpClassifier>),
    /// `(i, j, clf)` where `clf` predicts `classes[j]` against `classes[i]`.
    OneVsOne(Vec<(usize, usize, BinaryGpClassifier)>),
}

/// A fitted multiclass GP classifier.
///
/// Labels are class indices. Probability matrices have one column per index
/// in `0..n_columns`; labels never seen in training get probability zero.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GaussianProcessClassifier {
    classes: Vec<i64>,
    n_columns: usize,
    model: ClassModel,
}

impl GaussianProcessClassifier {
    /// Fit on `x` with labels `y`, producing `n_columns` wide probabilities.
    pub fn fit(
        x: ArrayView2<'_, f64>,
        y: ArrayView1<'_, i64>,
        settings: &GpSettings,
        n_columns: usize,
    ) -> Result<Self> {
        if x.nrows() != y.len() {
            return Err(AnnotatorError::shape(format!(
                "found {} samples but {} labels",
                x.nrows(),
                y.len()
            )));
        }
        if let Some(label) = y.iter().find(|&&label| label < 0) {
            return Err(AnnotatorError::shape(format!(
                "class labels must be non-negative, found {label}"
            )));
        }

        let mut classes = y.to_vec();
        classes.sort_unstable();
        classes.dedup();

        match classes.last() {
            None => return Err(AnnotatorError::shape("cannot fit a classifier on zero samples")),
            Some(&max) if max as usize >= n_columns => {
                return Err(AnnotatorError::internal(format!(
                    "label {max} does not fit in {n_columns} probability columns"
                )));
            }
            Some(_) => {}
        }

        let model = match classes.len() {
            1 => ClassModel::Constant,
            2 => ClassModel::Binary(fit_binary(x, indicator(y, classes[1]), settings)?),
            _ => match settings.strategy {
                MultiClassStrategy::OneVsRest => ClassModel::OneVsRest(
                    classes
                        .iter()
                        .map(|&class| fit_binary(x, indicator(y, class), settings))
                        .collect::<Result<Vec<_>>>()?,
                ),
                MultiClassStrategy::OneVsOne => {
                    let mut pairs = Vec::new();
                    for i in 0..classes.len() {
                        for j in i + 1..classes.len() {
                            let rows: Vec<usize> = y
                                .iter()
                                .enumerate()
                                .filter(|(_, label)| **label == classes[i] || **label == classes[j])
                                .map(|(row, _)| row)
                                .collect();
                            let subset_x = x.select(Axis(0), &rows);
                            let subset_y = y.select(Axis(0), &rows);
                            let target = indicator(subset_y.view(), classes[j]);
                            let clf = fit_binary(subset_x.view(), target, settings)?;
                            pairs.push((i, j, clf));
                        }
                    }
                    ClassModel::OneVsOne(pairs)
                }
            },
        };

        Ok(Self {
            classes,
            n_columns,
            model,
        })
    }

    /// Class probabilities with shape `(x.nrows(), n_columns)`.
    pub fn predict_proba(&self, x: ArrayView2<'_, f64>) -> Result<Array2<f64>> {
        let m = x.nrows();
        let k = self.classes.len();
        let mut class_probs = Array2::<f64>::zeros((m, k));

        match &self.model {
            ClassModel::Constant => class_probs.column_mut(0).fill(1.0),
            ClassModel::Binary(clf) => {
                let p = clf.predict_proba(x)?;
                class_probs.column_mut(0).assign(&p.mapv(|v| 1.0 - v));
                class_probs.column_mut(1).assign(&p);
            }
            ClassModel::OneVsRest(clfs) => {
                for (c, clf) in clfs.iter().enumerate() {
                    class_probs.column_mut(c).assign(&clf.predict_proba(x)?);
                }
                for mut row in class_probs.rows_mut() {
                    let total = row.sum();
                    if total > 0.0 {
                        row /= total;
                    } else {
                        row.fill(1.0 / k as f64);
                    }
                }
            }
            ClassModel::OneVsOne(pairs) => {
                for (i, j, clf) in pairs {
                    let p = clf.predict_proba(x)?;
                    let mut column = class_probs.column_mut(*i);
                    column += &p.mapv(|v| 1.0 - v);
                    let mut column = class_probs.column_mut(*j);
                    column += &p;
                }
                class_probs /= (k * (k - 1)) as f64 / 2.0;
            }
        }

        let mut probs = Array2::<f64>::zeros((m, self.n_columns));
        for (c, &label) in self.classes.iter().enumerate() {
            probs
                .column_mut(label as usize)
                .assign(&class_probs.column(c));
        }
        Ok(probs)
    }

    /// Most probable label per row; ties go to the lower label.
    pub fn predict(&self, x: ArrayView2<'_, f64>) -> Result<Array1<i64>> {
        let probs = self.predict_proba(x)?;
        Ok(probs.map_axis(Axis(1), |row| {
            let mut best = 0;
            for (index, &p) in row.iter().enumerate() {
                if p > row[best] {
                    best = index;
                }
            }
            best as i64
        }))
    }

    /// Labels seen during training, ascending.
    pub fn classes(&self) -> &[i64] {
        &self.classes
    }

    /// Width of the probability matrices.
    pub fn n_columns(&self) -> usize {
        self.n_columns
    }
}

fn fit_binary(
    x: ArrayView2<'_, f64>,
    target: Array1<f64>,
    settings: &GpSettings,
) -> Result<BinaryGpClassifier> {
    BinaryGpClassifier::fit_best(
        x,
        target.view(),
        &settings.candidates,
        settings.max_iter_predict,
    )
}

fn indicator(y: ArrayView1<'_, i64>, positive: i64) -> Array1<f64> {
    y.mapv(|label| if label == positive { 1.0 } else { 0.0 })
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn settings(strategy: MultiClassStrategy) -> GpSettings {
        GpSettings {
            strategy,
            candidates: vec![RbfKernel::new(4.0, 1.0)],
            max_iter_predict: 100,
        }
    }

    fn three_clusters() -> (Array2<f64>, Array1<i64>) {
        let x = array![
            [0.0, 0.0],
            [0.2, 0.1],
            [0.1, 0.3],
            [3.0, 3.0],
            [3.2, 2.9],
            [2.9, 3.1],
            [0.0, 3.0],
            [0.2, 3.2],
            [-0.1, 2.9]
        ];
        let y = array![0, 0, 0, 1, 1, 1, 2, 2, 2];
        (x, y)
    }

    #[test]
    fn test_one_vs_rest_predicts_clusters() {
        let (x, y) = three_clusters();
        let clf =
            GaussianProcessClassifier::fit(x.view(), y.view(), &settings(MultiClassStrategy::OneVsRest), 3)
                .unwrap();
        assert_eq!(clf.classes(), &[0, 1, 2]);

        let probs = clf.predict_proba(x.view()).unwrap();
        assert_eq!(probs.dim(), (9, 3));
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(clf.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_one_vs_one_predicts_clusters() {
        let (x, y) = three_clusters();
        let clf =
            GaussianProcessClassifier::fit(x.view(), y.view(), &settings(MultiClassStrategy::OneVsOne), 3)
                .unwrap();
        let probs = clf.predict_proba(x.view()).unwrap();
        for row in probs.rows() {
            assert!((row.sum() - 1.0).abs() < 1e-9);
        }
        assert_eq!(clf.predict(x.view()).unwrap(), y);
    }

    #[test]
    fn test_single_class_is_constant() {
        let x = array![[0.0], [1.0]];
        let y = array![1, 1];
        let clf =
            GaussianProcessClassifier::fit(x.view(), y.view(), &settings(MultiClassStrategy::OneVsRest), 3)
                .unwrap();
        let probs = clf.predict_proba(array![[5.0]].view()).unwrap();
        assert_eq!(probs, array![[0.0, 1.0, 0.0]]);
        assert_eq!(clf.predict(array![[5.0]].view()).unwrap(), array![1]);
    }

    #[test]
    fn test_binary_scatters_into_label_columns() {
        let x = array![[-1.0], [-0.8], [0.8], [1.0]];
        let y = array![0, 0, 2, 2];
        let clf =
            GaussianProcessClassifier::fit(x.view(), y.view(), &settings(MultiClassStrategy::OneVsRest), 4)
                .unwrap();
        let probs = clf.predict_proba(array![[1.0]].view()).unwrap();
        assert_eq!(probs.dim(), (1, 4));
        assert_eq!(probs[[0, 1]], 0.0);
        assert_eq!(probs[[0, 3]], 0.0);
        assert!(probs[[0, 2]] > probs[[0, 0]]);
    }

    #[test]
    fn test_rejects_bad_labels() {
        let x = array![[0.0], [1.0]];
        let s = settings(MultiClassStrategy::OneVsRest);
        assert!(GaussianProcessClassifier::fit(x.view(), array![0, -1].view(), &s, 2).is_err());
        assert!(GaussianProcessClassifier::fit(x.view(), array![0, 5].view(), &s, 2).is_err());
        assert!(GaussianProcessClassifier::fit(x.view(), array![0].view(), &s, 2).is_err());
    }
}
