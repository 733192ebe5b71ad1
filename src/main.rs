use std::{
    io::{self, Write},
    process,
};

use futures::StreamExt;
use rendition::{
    application::{
        error::AppError,
        render::{
            DeliveryMode, RenderOutcome, ShortCircuit, render_to_async_iterable,
            render_to_readable_stream, render_to_string,
        },
    },
    config::{self, RenderArgs, Settings},
    infra::{
        error::InfraError,
        http::{self, HttpState},
        telemetry,
    },
    presentation::site,
};
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
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt()
        .with_max_level(Level::ERROR)
        .with_writer(io::stderr)
        .finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Render(args) => run_render(settings, args).await,
    }
}

async fn run_serve(settings: Settings) -> Result<(), AppError> {
    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!(
        addr = %settings.server.addr,
        delivery = %settings.render.delivery,
        compress_html = settings.render.compress_html,
        "serving rendered pages"
    );

    let router = http::build_router(HttpState {
        render: settings.render,
    });

    axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;

    info!("server stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        return;
    }
    info!("shutdown signal received");
}

async fn run_render(settings: Settings, args: RenderArgs) -> Result<(), AppError> {
    let route = site::resolve(&args.path);
    let ctx = route.context(&settings.render);
    let mode = settings.render.delivery;

    info!(path = %args.path, delivery = %mode, "rendering route");

    match mode {
        DeliveryMode::String => match render_to_string(ctx, route.call).await? {
            RenderOutcome::Response(response) => report_short_circuit(&response),
            RenderOutcome::Body(html) => write_stdout(html.as_bytes())?,
        },
        DeliveryMode::Stream => match render_to_readable_stream(ctx, route.call).await? {
            RenderOutcome::Response(response) => report_short_circuit(&response),
            RenderOutcome::Body(mut stream) => {
                while let Some(chunk) = stream.next().await {
                    write_stdout(&chunk?)?;
                }
            }
        },
        DeliveryMode::Iterable => match render_to_async_iterable(ctx, route.call).await? {
            RenderOutcome::Response(response) => report_short_circuit(&response),
            RenderOutcome::Body(mut iterable) => loop {
                let chunk = iterable.next().await?;
                if chunk.done {
                    break;
                }
                write_stdout(&chunk.value)?;
            },
        },
    }

    Ok(())
}

fn report_short_circuit(response: &ShortCircuit) {
    info!(
        status = response.status().as_u16(),
        location = response.location().unwrap_or("-"),
        "route answered with a response instead of a body"
    );
}

fn write_stdout(bytes: &[u8]) -> Result<(), InfraError> {
    let mut stdout = io::stdout().lock();
    stdout.write_all(bytes)?;
    stdout.flush()?;
    Ok(())
}
