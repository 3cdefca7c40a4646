//! End-to-end tests of a dashboard session against the mock backend.

use pretty_assertions::assert_eq;
use serde_json::json;
use std::sync::Arc;
use tracedash_core::{
    ApiError, Dashboard, DashboardConfig, ExperimentsResponse, GridStatus, MockBackend,
    PanelContent, PanelState, PlotFigure, SettingsStore, SettingsUpdate, Trace, XAxisMode,
    YAxisScale,
};

fn experiments() -> ExperimentsResponse {
    serde_json::from_value(json!({
        "experiments": {
            "run_a": {
                "id": "run_a",
                "metadata": {
                    "experiment_id": "run_a",
                    "start_time": 1700000000.0,
                    "start_time_iso": "2023-11-14T22:13:20",
                    "status": "completed"
                },
                "log_count": 120
            },
            "run_b": {
                "id": "run_b",
                "metadata": {
                    "experiment_id": "run_b",
                    "start_time": 1700003600.0,
                    "start_time_iso": "2023-11-14T23:13:20",
                    "status": "running"
                },
                "log_count": 40
            }
        },
        "metrics": ["loss", "accuracy", "lr"]
    }))
    .unwrap()
}

fn figure(experiments: &[&str]) -> PlotFigure {
    PlotFigure {
        data: experiments
            .iter()
            .map(|id| {
                Trace::new(
                    *id,
                    vec![0.0, 1.0, 2.0, 3.0, 4.0],
                    vec![Some(1.0), Some(0.8), None, Some(0.5), Some(0.4)],
                )
            })
            .collect(),
        layout: json!({"title": "loss"}),
    }
}

async fn session(backend: &Arc<MockBackend>) -> Dashboard {
    backend.set_experiments(experiments());
    let mut dashboard = Dashboard::from_config(backend.clone(), &DashboardConfig::default()).unwrap();
    dashboard.reload_experiments().await.unwrap();
    dashboard
}

#[tokio::test]
async fn test_single_metric_loads_to_ready() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_b", "run_a"]));
    let mut dash = session(&backend).await;

    dash.toggle_experiment("run_a");
    dash.toggle_experiment("run_b");
    dash.toggle_metric("loss");

    assert_eq!(dash.orchestrator().panel("loss"), Some(&PanelState::Loading));
    assert_eq!(dash.status(), GridStatus::Loading);

    dash.settle().await;

    let requests = backend.plot_requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(requests[0].metric, "loss");
    assert_eq!(requests[0].experiments, vec!["run_b", "run_a"]);
    assert_eq!(requests[0].x_axis, XAxisMode::Step);
    assert_eq!(requests[0].y_axis_scale, YAxisScale::Linear);

    assert_eq!(dash.status(), GridStatus::Ready);
    let view = dash.view();
    assert_eq!(view.experiment_count, 2);
    assert_eq!(view.running_count, 1);
    let PanelContent::Plot { title, traces } = &view.panels[0].content else {
        panic!("expected plot, got {:?}", view.panels[0].content);
    };
    assert_eq!(title.as_deref(), Some("loss"));
    assert_eq!(traces.len(), 2);
}

#[tokio::test]
async fn test_failure_is_isolated_to_its_panel() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_a"]));
    backend.set_plot_error(
        "accuracy",
        ApiError::Connection {
            message: "connection reset".into(),
        },
    );
    let mut dash = session(&backend).await;

    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    dash.toggle_metric("accuracy");
    dash.settle().await;

    let view = dash.view();
    let by_metric = |m: &str| {
        view.panels
            .iter()
            .find(|p| p.metric == m)
            .map(|p| p.content.clone())
            .unwrap()
    };
    assert!(matches!(by_metric("loss"), PanelContent::Plot { .. }));
    match by_metric("accuracy") {
        PanelContent::Error(message) => {
            assert!(!message.is_empty());
            assert!(message.contains("accuracy"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(view.status, GridStatus::Ready);
}

#[tokio::test]
async fn test_deselected_metric_never_shows_late_data() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_a"]));
    backend.set_plot("accuracy", figure(&["run_a"]));
    backend.hold("loss");
    let mut dash = session(&backend).await;

    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    dash.toggle_metric("accuracy");
    let first_generation = dash.orchestrator().generation();

    // Deselect before the held fetch resolves.
    dash.toggle_metric("loss");
    assert!(dash.orchestrator().generation() > first_generation);
    backend.release("loss");
    dash.settle().await;

    assert!(dash.orchestrator().panel("loss").is_none());
    let view = dash.view();
    assert_eq!(view.panels.len(), 1);
    assert_eq!(view.panels[0].metric, "accuracy");
    assert!(matches!(view.panels[0].content, PanelContent::Plot { .. }));
}

#[tokio::test]
async fn test_late_result_from_old_selection_is_discarded() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_a"]));
    let mut dash = session(&backend).await;

    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    let stale_generation = dash.orchestrator().generation();
    dash.toggle_experiment("run_b");

    let applied = dash.apply_outcome(tracedash_core::FetchOutcome {
        generation: stale_generation,
        metric: "loss".into(),
        result: Ok(figure(&["run_a"])),
    });
    assert!(!applied);
    assert_eq!(dash.orchestrator().panel("loss"), Some(&PanelState::Loading));

    dash.settle().await;
    let last = backend.plot_requests().pop().unwrap();
    assert_eq!(last.experiments, vec!["run_b", "run_a"]);
}

#[tokio::test]
async fn test_no_data_when_backend_returns_empty_figures() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", PlotFigure::default());
    backend.set_plot("lr", PlotFigure::default());
    let mut dash = session(&backend).await;

    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    dash.toggle_metric("lr");
    dash.settle().await;

    assert_eq!(dash.status(), GridStatus::NoData);
    assert!(
        dash.view()
            .panels
            .iter()
            .all(|p| p.content == PanelContent::Empty)
    );
}

#[tokio::test]
async fn test_display_settings_only_change_view() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_a"]));
    let mut dash = session(&backend).await;
    dash.load_palettes().await;

    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    dash.settle().await;
    let generation = dash.orchestrator().generation();

    dash.update_settings(SettingsUpdate {
        smoothing: Some(0.6),
        ..Default::default()
    });
    assert_eq!(dash.orchestrator().generation(), generation);
    assert_eq!(backend.plot_requests().len(), 1);

    let view = dash.view();
    let PanelContent::Plot { traces, .. } = &view.panels[0].content else {
        panic!("expected plot");
    };
    let names: Vec<&str> = traces.iter().map(|t| t.name.as_deref().unwrap()).collect();
    assert_eq!(names, vec!["run_a", "run_a (smoothed)"]);
    // positional colors run over the expanded list
    assert_eq!(traces[0].color(), Some("#636EFA"));
    assert_eq!(traces[1].color(), Some("#EF553B"));
}

#[tokio::test]
async fn test_auto_refresh_keeps_figures_visible() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot("loss", figure(&["run_a"]));
    let mut dash = session(&backend).await;
    dash.toggle_experiment("run_a");
    dash.toggle_metric("loss");
    dash.settle().await;

    backend.hold("loss");
    assert!(dash.refresh_plots().is_some());
    assert_eq!(dash.status(), GridStatus::Ready);
    assert!(matches!(
        dash.view().panels[0].content,
        PanelContent::Plot { .. }
    ));

    backend.release("loss");
    dash.settle().await;
    assert_eq!(backend.plot_requests().len(), 2);
}

#[tokio::test]
async fn test_layout_follows_metric_selection() {
    let backend = Arc::new(MockBackend::new());
    let mut dash = session(&backend).await;
    for metric in ["lr", "loss", "accuracy"] {
        dash.toggle_metric(metric);
    }

    let layout: Vec<(String, u32, u32)> = dash
        .view()
        .panels
        .iter()
        .map(|p| (p.metric.clone(), p.rect.x, p.rect.y))
        .collect();
    assert_eq!(
        layout,
        vec![
            ("loss".to_string(), 0, 0),
            ("accuracy".to_string(), 6, 0),
            ("lr".to_string(), 0, 6),
        ]
    );

    dash.move_panel("lr", 6, 6).unwrap();
    assert_eq!(dash.layout().panel("lr").map(|p| (p.x, p.y)), Some((6, 6)));

    // any change of the metric set restores the default arrangement
    dash.toggle_metric("accuracy");
    assert!(!dash.layout().is_customized());
    assert_eq!(dash.layout().panel("lr").map(|p| (p.x, p.y)), Some((6, 0)));
}

#[tokio::test]
async fn test_palette_failure_falls_back() {
    let backend = Arc::new(MockBackend::new());
    backend.set_plot_options(Err(ApiError::Timeout { timeout_secs: 30 }));
    let settings = SettingsStore::new();
    let dash = Dashboard::new(backend.clone(), settings.clone(), 2).unwrap();

    let catalog = dash.load_palettes().await;
    assert_eq!(catalog.palettes.len(), 1);
    assert_eq!(catalog.palettes[0].value, "plotly");
    assert_eq!(
        settings.active_palette().map(|p| p.colors.len()),
        Some(5)
    );
}
