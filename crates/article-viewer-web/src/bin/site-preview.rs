use std::env;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, ExitCode};
use std::time::Duration;

use article_viewer::source::resolve_under;
use article_viewer::ViewerConfig;
use article_viewer_web::{check_site, CheckOrigin, SiteReport};

const DEFAULT_ROOT: &str = "tests/fixtures/site";
const DEFAULT_SHELL: &str = "index.html";
const DEFAULT_PORT: u16 = 42818;

#[derive(Clone, Debug)]
struct Args {
    root: String,
    shell: String,
    config_path: Option<String>,
    serve: bool,
    open_browser: bool,
    port: u16,
    json: bool,
}

#[derive(Clone, Debug)]
struct HttpRequest {
    method: String,
    path: String,
}

fn main() -> ExitCode {
    match run(env::args().collect()) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(msg) => {
            eprintln!("error: {}", msg);
            eprintln!("{}", help_text());
            ExitCode::FAILURE
        }
    }
}

fn run(args: Vec<String>) -> Result<bool, String> {
    let cli = parse_args(args)?;
    let config = match &cli.config_path {
        Some(path) => ViewerConfig::from_json_file(path).map_err(|e| e.to_string())?,
        None => ViewerConfig::default(),
    };
    config.validate().map_err(|e| e.to_string())?;

    if cli.serve {
        run_server(Path::new(&cli.root), &cli.shell, cli.port, cli.open_browser)?;
        return Ok(true);
    }

    let report = check_site(Path::new(&cli.root), &cli.shell, &config)?;
    if cli.json {
        let json = serde_json::to_string_pretty(&report).map_err(|e| e.to_string())?;
        println!("{}", json);
    } else {
        print_report(&report);
    }
    Ok(report.is_clean())
}

fn print_report(report: &SiteReport) {
    for check in &report.fragments {
        let origin = match &check.origin {
            CheckOrigin::Tab(label) => format!("tab {}", label),
            CheckOrigin::Aux(id) => format!("button {}", id),
        };
        if check.rendered {
            println!(
                "ok    {} -> {} (title={}, rewritten={}, sections={}, cheers={}, row={})",
                origin,
                check.path,
                check.title,
                check.rewritten,
                check.sections,
                check.cheers,
                check.aux_row
            );
        } else {
            println!(
                "FAIL  {} -> {} ({})",
                origin,
                check.path,
                check.error.as_deref().unwrap_or("unavailable")
            );
        }
    }
    let failed = report.failures().count();
    println!(
        "checked {} fragments from {} tabs in {}: {} failed",
        report.fragments.len(),
        report.tabs,
        report.shell,
        failed
    );
}

fn run_server(root: &Path, shell: &str, port: u16, open_browser: bool) -> Result<(), String> {
    if !root.join(shell).is_file() {
        return Err(format!("shell {} not found under {}", shell, root.display()));
    }
    let listener = TcpListener::bind(("127.0.0.1", port)).map_err(|e| e.to_string())?;
    listener.set_nonblocking(false).map_err(|e| e.to_string())?;

    let addr = listener.local_addr().map_err(|e| e.to_string())?;
    let url = format!("http://{}:{}/", addr.ip(), addr.port());

    println!("serving {} at {}", root.display(), url);

    if open_browser {
        try_open_browser(&url);
    }

    for incoming in listener.incoming() {
        let mut stream = match incoming {
            Ok(stream) => stream,
            Err(err) => {
                eprintln!("accept error: {}", err);
                continue;
            }
        };
        if let Err(err) = stream.set_read_timeout(Some(Duration::from_secs(15))) {
            eprintln!("set timeout failed: {}", err);
        }
        if let Err(err) = handle_connection(&mut stream, root, shell) {
            eprintln!("request error: {}", err);
        }
    }

    Ok(())
}

fn try_open_browser(url: &str) {
    let mut opened = false;

    if let Ok(status) = Command::new("open").arg(url).status() {
        if status.success() {
            opened = true;
        }
    }

    if !opened {
        let _ = Command::new("xdg-open").arg(url).status();
    }
}

fn handle_connection(stream: &mut TcpStream, root: &Path, shell: &str) -> Result<(), String> {
    let req = read_http_request(stream)?;
    let path = req.path.split(['?', '#']).next().unwrap_or(&req.path);

    if req.method != "GET" {
        return write_http_response(
            stream,
            "405 Method Not Allowed",
            "text/plain; charset=utf-8",
            b"method not allowed",
        );
    }
    if path == "/favicon.ico" && !root.join("favicon.ico").is_file() {
        return write_http_response(stream, "204 No Content", "text/plain", &[]);
    }

    let decoded = percent_decode(path);
    let target = if decoded == "/" {
        Some(root.join(shell))
    } else {
        resolve_under(root, &decoded)
    };
    let Some(file) = target.map(index_if_dir) else {
        return write_http_response(
            stream,
            "403 Forbidden",
            "text/plain; charset=utf-8",
            b"forbidden",
        );
    };

    match std::fs::read(&file) {
        Ok(body) => {
            println!("GET {} -> 200", decoded);
            write_http_response(stream, "200 OK", mime_from_path(&file), &body)
        }
        Err(_) => {
            println!("GET {} -> 404", decoded);
            write_http_response(
                stream,
                "404 Not Found",
                "text/plain; charset=utf-8",
                b"not found",
            )
        }
    }
}

fn index_if_dir(path: PathBuf) -> PathBuf {
    if path.is_dir() {
        path.join("index.html")
    } else {
        path
    }
}

fn read_http_request(stream: &mut TcpStream) -> Result<HttpRequest, String> {
    let mut buf = Vec::with_capacity(4096);
    let mut chunk = [0u8; 1024];
    let mut header_end = None;

    while header_end.is_none() {
        let n = stream.read(&mut chunk).map_err(|e| e.to_string())?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);
        if let Some(idx) = find_header_end(&buf) {
            header_end = Some(idx);
            break;
        }
        if buf.len() > 64 * 1024 {
            return Err("request header too large".to_string());
        }
    }

    let header_end = header_end.ok_or_else(|| "incomplete http request".to_string())?;
    let header_text = String::from_utf8_lossy(&buf[..header_end]);
    let request_line = header_text
        .split("\r\n")
        .next()
        .ok_or_else(|| "missing request line".to_string())?;

    let mut req_parts = request_line.split_whitespace();
    let method = req_parts
        .next()
        .ok_or_else(|| "missing method".to_string())?
        .to_string();
    let path = req_parts
        .next()
        .ok_or_else(|| "missing path".to_string())?
        .to_string();

    Ok(HttpRequest { method, path })
}

fn find_header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

fn write_http_response(
    stream: &mut TcpStream,
    status: &str,
    content_type: &str,
    body: &[u8],
) -> Result<(), String> {
    let header = format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nCache-Control: no-store\r\nConnection: close\r\n\r\n",
        status,
        content_type,
        body.len()
    );
    stream
        .write_all(header.as_bytes())
        .map_err(|e| e.to_string())?;
    stream.write_all(body).map_err(|e| e.to_string())
}

fn mime_from_path(path: &Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();
    match ext.as_str() {
        "html" | "htm" => "text/html; charset=utf-8",
        "css" => "text/css; charset=utf-8",
        "js" | "mjs" => "text/javascript; charset=utf-8",
        "json" => "application/json",
        "wasm" => "application/wasm",
        "png" => "image/png",
        "jpg" | "jpeg" => "image/jpeg",
        "gif" => "image/gif",
        "webp" => "image/webp",
        "svg" => "image/svg+xml",
        "ico" => "image/x-icon",
        "mp3" => "audio/mpeg",
        "m4a" => "audio/mp4",
        "ogg" => "audio/ogg",
        "woff2" => "font/woff2",
        _ => "application/octet-stream",
    }
}

/// Decode `%XX` escapes; malformed escapes are kept verbatim.
fn percent_decode(path: &str) -> String {
    let bytes = path.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0usize;
    while i < bytes.len() {
        if bytes[i] == b'%' && i + 2 < bytes.len() {
            let hex = std::str::from_utf8(&bytes[i + 1..i + 3])
                .ok()
                .and_then(|h| u8::from_str_radix(h, 16).ok());
            if let Some(byte) = hex {
                out.push(byte);
                i += 3;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

fn parse_args(args: Vec<String>) -> Result<Args, String> {
    if args.len() >= 2 && (args[1] == "--help" || args[1] == "-h") {
        return Err("help requested".to_string());
    }

    let has_positional_root = args.get(1).is_some_and(|v| !v.starts_with("--"));

    let mut cfg = Args {
        root: if has_positional_root {
            args[1].clone()
        } else {
            DEFAULT_ROOT.to_string()
        },
        shell: DEFAULT_SHELL.to_string(),
        config_path: None,
        serve: false,
        open_browser: false,
        port: DEFAULT_PORT,
        json: false,
    };

    let mut i = if has_positional_root { 2usize } else { 1usize };
    while i < args.len() {
        match args[i].as_str() {
            "--shell" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--shell requires a value".to_string())?;
                cfg.shell = v.clone();
                i += 2;
            }
            "--config" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--config requires a value".to_string())?;
                cfg.config_path = Some(v.clone());
                i += 2;
            }
            "--serve" => {
                cfg.serve = true;
                i += 1;
            }
            "--check" => {
                cfg.serve = false;
                i += 1;
            }
            "--open" => {
                cfg.open_browser = true;
                i += 1;
            }
            "--port" => {
                let v = args
                    .get(i + 1)
                    .ok_or_else(|| "--port requires a value".to_string())?;
                cfg.port = v
                    .parse::<u16>()
                    .map_err(|_| format!("invalid --port value '{}'", v))?;
                i += 2;
            }
            "--json" => {
                cfg.json = true;
                i += 1;
            }
            other => return Err(format!("unknown argument '{}'", other)),
        }
    }

    if cfg.shell.is_empty() {
        return Err("--shell must not be empty".to_string());
    }
    Ok(cfg)
}

fn help_text() -> &'static str {
    r#"site-preview - check or serve an article-viewer site locally

USAGE:
  cargo run -p article-viewer-web --bin site-preview -- [site_root] [options]

MODES:
  --check (default): click through every tab and auxiliary button headlessly
                     and report fragments that fall back to the error block
  --serve:           serve the site over http for a real browser

OPTIONS:
  --shell <file>   page shell relative to the site root (default: index.html)
  --config <file>  viewer configuration JSON (default: built-in)
  --json           print the check report as JSON
  --open           open browser automatically (use with --serve)
  --port <n>       server port in --serve mode (default: 42818)
"#
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        std::iter::once("site-preview")
            .chain(list.iter().copied())
            .map(str::to_string)
            .collect()
    }

    #[test]
    fn percent_decode_handles_utf8_and_malformed_escapes() {
        assert_eq!(
            percent_decode("/articles/%E6%B6%85%E6%B3%A2.html"),
            "/articles/涅波.html"
        );
        assert_eq!(percent_decode("/a%2"), "/a%2");
        assert_eq!(percent_decode("/a%zz"), "/a%zz");
        assert_eq!(percent_decode("/Cheer%20Gift"), "/Cheer Gift");
    }

    #[test]
    fn parse_args_reads_modes_and_values() {
        let cli = parse_args(args(&["site", "--serve", "--port", "9000", "--open"])).expect("args");
        assert_eq!(cli.root, "site");
        assert!(cli.serve);
        assert!(cli.open_browser);
        assert_eq!(cli.port, 9000);

        let cli = parse_args(args(&["--json"])).expect("args");
        assert_eq!(cli.root, DEFAULT_ROOT);
        assert!(!cli.serve);
        assert!(cli.json);
    }

    #[test]
    fn parse_args_rejects_bad_input() {
        assert!(parse_args(args(&["--port", "x"])).is_err());
        assert!(parse_args(args(&["--bogus"])).is_err());
        assert!(parse_args(args(&["--shell"])).is_err());
    }

    #[test]
    fn mime_types_cover_site_assets() {
        assert_eq!(mime_from_path(Path::new("a/b.WEBP")), "image/webp");
        assert_eq!(mime_from_path(Path::new("pkg/viewer_bg.wasm")), "application/wasm");
        assert_eq!(mime_from_path(Path::new("noext")), "application/octet-stream");
    }
}
