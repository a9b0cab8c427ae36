use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    response::Html,
    routing::get,
    Router,
};
use painting_restoration::{
    pipeline::{allowed_file, secure_filename},
    ContextEncoderConfig, Error, Pipeline, ResultNames, Restorer,
};
use parking_lot::Mutex;
use std::{net::SocketAddr, path::PathBuf, sync::Arc};
use structopt::StructOpt;
use tower_http::services::ServeDir;
use tracing::{error, info, warn};

const PAGE: &str = include_str!("page.html");

#[derive(StructOpt)]
#[structopt(rename_all = "kebab-case")]
pub(crate) struct Args {
    /// Address to listen on
    #[structopt(long, default_value = "127.0.0.1:5000")]
    addr: SocketAddr,
    /// Directory served under `/static`. Uploads and results are written to
    /// its `uploads` and `results` subdirectories
    #[structopt(long, parse(from_os_str), default_value = "frontend/static")]
    static_dir: PathBuf,
    /// The largest accepted upload, in megabytes
    #[structopt(long, default_value = "16")]
    max_upload_mb: usize,
}

struct AppState {
    // inference is CPU bound and one request is processed at a time
    pipeline: Mutex<Pipeline>,
    uploads: PathBuf,
    results: PathBuf,
}

/// What the page shows, all paths are relative to `/static`
#[derive(Default)]
struct Page {
    message: Option<String>,
    original: Option<String>,
    results: Option<ResultNames>,
}

pub(crate) fn cmd(args: &Args, global_opts: &crate::Opt) -> Result<(), Error> {
    let uploads = args.static_dir.join("uploads");
    let results = args.static_dir.join("results");
    std::fs::create_dir_all(&uploads)?;
    std::fs::create_dir_all(&results)?;

    let restorer = Restorer::new(ContextEncoderConfig::new(), &global_opts.weights)?;
    let dims = restorer.dims();
    info!(
        width = dims.width,
        height = dims.height,
        trained = restorer.weights_loaded(),
        "model ready"
    );
    let state = Arc::new(AppState {
        pipeline: Mutex::new(Pipeline::new(restorer)),
        uploads,
        results,
    });

    let app = Router::new()
        .route("/", get(index).post(upload))
        .nest_service("/static", ServeDir::new(&args.static_dir))
        .layer(DefaultBodyLimit::max(args.max_upload_mb * 1024 * 1024))
        .with_state(state);

    let addr = args.addr;
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()?;

    runtime.block_on(async move {
        let listener = tokio::net::TcpListener::bind(addr).await?;
        info!(%addr, "listening");

        axum::serve(listener, app)
            .with_graceful_shutdown(shutdown_signal())
            .await?;

        info!("server stopped");
        Ok::<(), Error>(())
    })
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("unable to listen for ctrl-c: {}", e);
        std::future::pending::<()>().await;
    }
}

async fn index() -> Html<String> {
    Html(render(&Page::default()))
}

async fn upload(State(state): State<Arc<AppState>>, multipart: Multipart) -> Html<String> {
    let page = match handle_upload(state, multipart).await {
        Ok(page) => page,
        Err(message) => {
            warn!("{}", message);
            Page {
                message: Some(message),
                ..Page::default()
            }
        }
    };

    Html(render(&page))
}

async fn handle_upload(state: Arc<AppState>, mut multipart: Multipart) -> Result<Page, String> {
    let mut file = None;
    while let Some(field) = multipart.next_field().await.map_err(|e| e.to_string())? {
        if field.name() == Some("file") {
            let name = field.file_name().unwrap_or_default().to_owned();
            let data = field.bytes().await.map_err(|e| e.to_string())?;
            file = Some((name, data));
            break;
        }
    }

    let (name, data) = file.ok_or_else(|| "No file part".to_owned())?;
    if name.is_empty() {
        return Err("No selected file".to_owned());
    }
    if !allowed_file(&name) {
        return Err("File type not allowed".to_owned());
    }
    let name = secure_filename(&name).ok_or_else(|| "No selected file".to_owned())?;

    let upload_path = state.uploads.join(&name);
    tokio::fs::write(&upload_path, &data)
        .await
        .map_err(|e| format!("Unable to save upload: {}", e))?;
    info!(path = %upload_path.display(), bytes = data.len(), "upload saved");

    let timestamp = chrono::Utc::now().timestamp();
    let names = tokio::task::spawn_blocking(move || {
        let pipeline = state.pipeline.lock();
        pipeline.run(&upload_path, &state.results, timestamp)
    })
    .await
    .map_err(|e| format!("Error during restoration: {}", e))?
    .map_err(|e| {
        error!("restoration failed: {}", e);
        format!("Error during restoration: {}", e)
    })?;

    Ok(Page {
        message: None,
        original: Some(format!("uploads/{}", name)),
        results: Some(names),
    })
}

fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            c => out.push(c),
        }
    }
    out
}

fn figure(caption: &str, path: &str) -> String {
    format!(
        "<figure><img src=\"/static/{}\" alt=\"{}\"><figcaption>{}</figcaption></figure>\n",
        escape(path),
        escape(caption),
        escape(caption)
    )
}

fn render(page: &Page) -> String {
    let message = page
        .message
        .as_deref()
        .map(|m| format!("<p class=\"flash\">{}</p>", escape(m)))
        .unwrap_or_default();

    let mut results = String::new();
    if let Some(original) = &page.original {
        results.push_str(&figure("Original", original));
    }
    if let Some(names) = &page.results {
        results.push_str(&figure("Edge map", &format!("results/{}", names.edge)));
        results.push_str(&figure("Restored", &format!("results/{}", names.restored)));
        results.push_str(&figure("Enhanced", &format!("results/{}", names.enhanced)));
    }

    PAGE.replace("{{message}}", &message)
        .replace("{{results}}", &results)
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn empty_page_has_form_only() {
        let html = render(&Page::default());
        assert!(html.contains("enctype=\"multipart/form-data\""));
        assert!(!html.contains("<figure>"));
        assert!(!html.contains("{{"));
    }

    #[test]
    fn messages_are_escaped() {
        let html = render(&Page {
            message: Some("Error during restoration: <script>".to_owned()),
            ..Page::default()
        });
        assert!(html.contains("Error during restoration: &lt;script&gt;"));
    }

    #[test]
    fn results_link_to_static_files() {
        let html = render(&Page {
            message: None,
            original: Some("uploads/fresco.jpg".to_owned()),
            results: Some(ResultNames::new("fresco", 7)),
        });

        for src in [
            "/static/uploads/fresco.jpg",
            "/static/results/fresco_edge_7.jpg",
            "/static/results/fresco_restored_7.jpg",
            "/static/results/fresco_enhanced_7.jpg",
        ] {
            assert!(html.contains(src), "missing {}", src);
        }
    }
}
