//! Integration test: registries, pipeline construction and prediction

use ndarray::Array1;
use textclf::feature_engineering::FeatureSet;
use textclf::optimizer::{GridSearchCV, ParamGrid};
use textclf::pipeline::Pipeline;
use textclf::training::{accuracy_score, train_test_split, ClassifierKind, Label};
use textclf::TextClfError;

fn labeled_corpus() -> (Vec<String>, Array1<f64>) {
    let negative = ["awful", "boring", "terrible", "dull", "worst"];
    let positive = ["great", "wonderful", "superb", "brilliant", "best"];
    let mut docs = Vec::new();
    let mut y = Vec::new();
    for i in 0..15 {
        docs.push(format!("the {} movie was {} indeed", negative[i % 5], negative[(i + 2) % 5]));
        y.push(0.0);
        docs.push(format!("the {} movie was {} indeed", positive[i % 5], positive[(i + 2) % 5]));
        y.push(1.0);
    }
    (docs, Array1::from_vec(y))
}

#[test]
fn test_every_feature_and_classifier_combination_fits() {
    let (docs, y) = labeled_corpus();

    for feature in FeatureSet::ALL {
        for classifier in ClassifierKind::ALL {
            let mut pipeline = Pipeline::from_names(&[feature.name()], classifier.name()).unwrap();
            pipeline.fit(&docs, &y).unwrap();

            let predictions = pipeline.predict(&docs).unwrap();
            assert_eq!(predictions.len(), docs.len());
            assert!(predictions.iter().all(|&p| p == 0.0 || p == 1.0));
            let acc = accuracy_score(&y, &predictions).unwrap();
            assert!(acc >= 0.8, "{} + {} training accuracy {}", feature, classifier, acc);
        }
    }
}

#[test]
fn test_unknown_registry_names() {
    assert!(matches!(
        Pipeline::from_names(&["both_gram", "char_gram"], "nb"),
        Err(TextClfError::UnknownFeature(name)) if name == "char_gram"
    ));
    assert!(matches!(
        Pipeline::from_names(&["both_gram"], "knn"),
        Err(TextClfError::UnknownClassifier(name)) if name == "knn"
    ));
}

#[test]
fn test_prediction_count_matches_documents() {
    let (docs, y) = labeled_corpus();
    let mut pipeline = Pipeline::from_names(&["both_gram"], "nb").unwrap();
    pipeline.fit(&docs, &y).unwrap();

    let unseen = vec![
        "a wonderful and brilliant movie".to_string(),
        "words never seen before".to_string(),
        "boring".to_string(),
    ];
    let labels = pipeline.predict_labels(&unseen).unwrap();
    assert_eq!(labels.len(), 3);
    assert_eq!(labels[0], Label::Positive);
    assert_eq!(labels[2], Label::Negative);
}

#[test]
fn test_holdout_split_then_score() {
    let (docs, y) = labeled_corpus();
    let indices: Vec<usize> = (0..docs.len()).collect();
    let (train_idx, val_idx) = train_test_split(&indices, 0.2, 42).unwrap();
    assert_eq!(val_idx.len(), 6);

    let pick = |idx: &[usize]| -> (Vec<String>, Array1<f64>) {
        (idx.iter().map(|&i| docs[i].clone()).collect(), idx.iter().map(|&i| y[i]).collect())
    };
    let (train_docs, y_train) = pick(&train_idx);
    let (val_docs, y_val) = pick(&val_idx);

    let mut pipeline = Pipeline::from_names(&["both_gram", "tfidf"], "lin_svm").unwrap();
    pipeline.fit(&train_docs, &y_train).unwrap();
    let acc = accuracy_score(&y_val, &pipeline.predict(&val_docs).unwrap()).unwrap();
    assert!((0.0..=1.0).contains(&acc));
}

#[test]
fn test_grid_search_degenerates_to_single_fit() {
    let (docs, y) = labeled_corpus();
    let pipeline = Pipeline::from_names(&["both_gram"], "sgd").unwrap();

    let mut plain = pipeline.clone();
    plain.fit(&docs, &y).unwrap();

    let mut search = GridSearchCV::new(pipeline, ParamGrid::new(), 5);
    search.fit(&docs, &y).unwrap();

    assert_eq!(search.predict(&docs).unwrap(), plain.predict(&docs).unwrap());
    assert!(search.best_score().is_some());
}
