use std::{num::NonZeroUsize, process, sync::Arc};

use placard::{
    application::{
        error::AppError,
        pipeline::{ItemRenderService, builtin_loaders},
        placement::PlacementStrategy,
        render::{AssetPaths, CachedResolver, RenderDispatcher, RenderOptions, RenderedPage},
    },
    config::{self, InputArgs},
    domain::shape::Shape,
    infra::{error::InfraError, rules, telemetry},
    presentation::templates::builtin_registry,
};
use tokio::{io::AsyncWriteExt, sync::mpsc};
use tracing::{Dispatch, Level, dispatcher, error, info};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        let report = error.report();
        error!(source = report.source, error = %report.summary(), "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error.report().summary(), "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli().map_err(InfraError::from)?;

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    let rules = rules::load_rule_files(&settings.placement.rule_files).await?;
    let placement = PlacementStrategy::new(Arc::new(rules));

    match cli_args.command {
        config::Command::Place(args) => run_place(placement, &args.input).await,
        config::Command::Render(args) => run_render(&settings, placement, &args.input).await,
    }
}

async fn run_place(placement: PlacementStrategy, input: &InputArgs) -> Result<(), AppError> {
    let tree = match (&input.shapes, &input.item) {
        (Some(path), _) => {
            let shapes = rules::load_shapes(path).await?;
            placement.place_shapes(Shape::layout(), shapes)
        }
        (None, Some(path)) => {
            let item = rules::load_item(path).await?;
            item_service(placement, RenderOptions::default())
                .place_item(&item, &input.display_type)
                .await?
        }
        (None, None) => return Err(AppError::validation("either --shapes or --item is required")),
    };

    let json = serde_json::to_string_pretty(&tree.to_value())
        .map_err(|err| AppError::unexpected(format!("failed to encode zone tree: {err}")))?;
    let mut stdout = tokio::io::stdout();
    stdout
        .write_all(json.as_bytes())
        .await
        .map_err(InfraError::from)?;
    stdout
        .write_all(b"\n")
        .await
        .map_err(InfraError::from)?;
    Ok(())
}

async fn run_render(
    settings: &config::Settings,
    placement: PlacementStrategy,
    input: &InputArgs,
) -> Result<(), AppError> {
    let options = render_options(&settings.render);
    let (sender, mut receiver) = mpsc::unbounded_channel::<String>();

    let writer = tokio::spawn(async move {
        let mut stdout = tokio::io::stdout();
        while let Some(chunk) = receiver.recv().await {
            stdout.write_all(chunk.as_bytes()).await?;
        }
        stdout.flush().await
    });

    let rendered: RenderedPage = match (&input.shapes, &input.item) {
        (Some(path), _) => {
            let shapes = rules::load_shapes(path).await?;
            let tree = placement.place_shapes(Shape::layout(), shapes);
            build_dispatcher(options).stream_page(&tree, sender).await?
        }
        (None, Some(path)) => {
            let item = rules::load_item(path).await?;
            item_service(placement, options)
                .stream_item(&item, &input.display_type, sender)
                .await?
        }
        (None, None) => return Err(AppError::validation("either --shapes or --item is required")),
    };

    writer
        .await
        .map_err(|err| AppError::unexpected(format!("output writer failed: {err}")))?
        .map_err(InfraError::from)?;

    info!(
        scripts = rendered.resources.scripts().count(),
        stylesheets = rendered.resources.stylesheets().count(),
        "page rendered"
    );
    Ok(())
}

fn render_options(render: &config::RenderSettings) -> RenderOptions {
    let sibling_concurrency = usize::try_from(render.sibling_concurrency.get())
        .ok()
        .and_then(NonZeroUsize::new)
        .unwrap_or(NonZeroUsize::MIN);

    RenderOptions {
        default_template: render.default_template.clone(),
        sibling_concurrency,
        assets: AssetPaths {
            script_base: render.script_base.clone(),
            style_base: render.style_base.clone(),
            minify: render.minify_assets,
        },
    }
}

fn build_dispatcher(options: RenderOptions) -> RenderDispatcher {
    RenderDispatcher::new(Arc::new(CachedResolver::new(builtin_registry())), options)
}

fn item_service(placement: PlacementStrategy, options: RenderOptions) -> ItemRenderService {
    ItemRenderService::new(builtin_loaders(), placement, build_dispatcher(options))
}
