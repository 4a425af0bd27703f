#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use tempfile::tempdir;

    use crate::constants::{FUTURE_STEPS, UNIVARIATE_COLUMN};
    use crate::data::PriceHistory;
    use crate::error::ForecastError;
    use crate::model_family::ModelKind;
    use crate::pipeline::run_forecast;
    use crate::test::test_utils::{quick_settings, synthetic_history};
    use crate::training::step_6_model_serialization::load_metadata;
    use crate::util::feature_engineering::process_and_split_multivariate_data;
    use crate::util::model_utils::get_model_path;
    use crate::util::pre_processor::train_test_split;

    fn date(s: &str) -> NaiveDate {
        NaiveDate::parse_from_str(s, "%Y-%m-%d").unwrap()
    }

    #[test]
    fn test_run_forecast_shapes_and_artifacts() {
        let temp_dir = tempdir().unwrap();
        let settings = quick_settings(temp_dir.path());
        let history = synthetic_history(2015, 2018);

        let report = run_forecast(&history, "TEST", date("2018-12-31"), &settings).unwrap();
        let predictions = &report.predictions;

        // One prediction per training window
        let (training, test) = train_test_split(&history, 2016, 2017, &[UNIVARIATE_COLUMN]).unwrap();
        assert_eq!(predictions.rnn_predictions.len(), training.len() - settings.n_steps);
        assert_eq!(predictions.lstm_predictions.len(), training.len() - settings.n_steps);
        assert!(!test.is_empty());

        let split = process_and_split_multivariate_data(&history, 2016, 2017, 6, 1).unwrap();
        assert_eq!(predictions.multivariate_lstm_predictions.len(), split.x_test.len());

        assert_eq!(predictions.future_predictions.len(), FUTURE_STEPS);
        for list in [
            &predictions.rnn_predictions,
            &predictions.lstm_predictions,
            &predictions.multivariate_lstm_predictions,
            &predictions.future_predictions,
        ] {
            assert!(list.iter().all(|row| row.len() == 1 && row[0].is_finite()));
        }

        assert!(report.metrics.rnn_test_rmse.is_some());
        assert!(report.metrics.lstm_test_rmse.is_some());
        assert!(report.metrics.multivariate_lstm_test_rmse.is_some());

        for kind in ModelKind::ALL {
            let path = get_model_path(temp_dir.path(), "TEST", "2018-12-31", kind);
            assert!(path.with_extension("bin").exists(), "Missing artifact for {}", kind);
            let metadata = load_metadata(&path).unwrap();
            assert_eq!(metadata.kind, kind);
            assert_eq!(metadata.hidden_size, 8);
        }
    }

    #[test]
    fn test_predictions_are_in_price_units() {
        let temp_dir = tempdir().unwrap();
        let mut settings = quick_settings(temp_dir.path());
        settings.save_models = false;
        let history = synthetic_history(2015, 2017);

        let report = run_forecast(&history, "TEST", date("2017-12-31"), &settings).unwrap();

        let highs = history.column_values("high").unwrap();
        let max_high = highs.iter().cloned().fold(f64::MIN, f64::max);
        // Scaled outputs would all sit near [0, 1]
        let mean = report
            .predictions
            .lstm_predictions
            .iter()
            .map(|row| row[0])
            .sum::<f64>()
            / report.predictions.lstm_predictions.len() as f64;
        assert!(mean > 10.0 && mean < max_high * 2.0, "mean = {}", mean);
        assert!(!temp_dir.path().join("TEST").exists());
    }

    #[test]
    fn test_multivariate_predictions_are_in_target_units() {
        let temp_dir = tempdir().unwrap();
        let mut settings = quick_settings(temp_dir.path());
        settings.save_models = false;
        settings.future_steps = 1;
        let history = synthetic_history(2015, 2018);

        let report = run_forecast(&history, "TEST", date("2018-12-31"), &settings).unwrap();

        // Training range of the next-day adj_close - open target
        let split = process_and_split_multivariate_data(&history, 2016, 2017, 6, 1).unwrap();
        let target_min = split.target_scaler.inverse_transform_value(0, 0.0);
        let target_max = split.target_scaler.inverse_transform_value(0, 1.0);
        let span = target_max - target_min;
        let (low, high) = (target_min - 4.0 * span, target_max + 4.0 * span);

        let min_high = history
            .column_values("high")
            .unwrap()
            .into_iter()
            .fold(f64::MAX, f64::min);
        assert!(high < min_high, "target and price ranges overlap");

        let predictions = &report.predictions.multivariate_lstm_predictions;
        assert!(!predictions.is_empty());
        for row in predictions {
            assert!(
                row[0] > low && row[0] < high,
                "{} is outside the target range [{}, {}]",
                row[0],
                target_min,
                target_max
            );
        }
    }

    #[test]
    fn test_empty_test_set_has_no_metrics() {
        let temp_dir = tempdir().unwrap();
        let mut settings = quick_settings(temp_dir.path());
        settings.save_models = false;
        settings.future_steps = 3;
        let history = synthetic_history(2015, 2017);

        let report = run_forecast(&history, "TEST", date("2017-12-31"), &settings).unwrap();

        assert_eq!(report.metrics.rnn_test_rmse, None);
        assert_eq!(report.metrics.lstm_test_rmse, None);
        assert_eq!(report.metrics.multivariate_lstm_test_rmse, None);
        assert!(report.predictions.multivariate_lstm_predictions.is_empty());
        assert_eq!(report.predictions.future_predictions.len(), 3);
    }

    #[test]
    fn test_reused_models_give_same_predictions() {
        let temp_dir = tempdir().unwrap();
        let mut settings = quick_settings(temp_dir.path());
        settings.future_steps = 5;
        let history = synthetic_history(2015, 2018);

        let first = run_forecast(&history, "TEST", date("2018-12-31"), &settings).unwrap();
        settings.reuse_models = true;
        let second = run_forecast(&history, "TEST", date("2018-12-31"), &settings).unwrap();

        let close = |a: &[Vec<f64>], b: &[Vec<f64>]| {
            a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x[0] - y[0]).abs() < 1e-6)
        };
        assert!(close(&first.predictions.rnn_predictions, &second.predictions.rnn_predictions));
        assert!(close(&first.predictions.lstm_predictions, &second.predictions.lstm_predictions));
        assert!(close(
            &first.predictions.multivariate_lstm_predictions,
            &second.predictions.multivariate_lstm_predictions
        ));
        assert!(close(&first.predictions.future_predictions, &second.predictions.future_predictions));
    }

    #[test]
    fn test_empty_history_is_no_data() {
        let temp_dir = tempdir().unwrap();
        let history = PriceHistory::from_bars(Vec::new()).unwrap();
        let err = run_forecast(&history, "NOPE", date("2024-01-02"), &quick_settings(temp_dir.path()))
            .unwrap_err();
        assert!(matches!(err, ForecastError::NoData { ref ticker } if ticker == "NOPE"));
    }

    #[test]
    fn test_history_before_training_years_is_insufficient() {
        let temp_dir = tempdir().unwrap();
        let history = synthetic_history(2013, 2014);
        let err = run_forecast(&history, "OLD", date("2014-12-31"), &quick_settings(temp_dir.path()))
            .unwrap_err();
        assert!(matches!(err, ForecastError::InsufficientData { rows: 0, .. }));
    }
}
