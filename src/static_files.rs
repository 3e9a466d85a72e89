use actix_web::{web, HttpResponse};
use log::warn;
use std::path::{Component, Path, PathBuf};

const DEFAULT_DOCUMENT: &str = "index.html";

pub async fn serve(url_path: &str, static_dir: &Path) -> HttpResponse {
    let Some(file_path) = resolve_path(static_dir, url_path) else {
        warn!("Rejected unsafe static path: {url_path}");
        return not_found();
    };

    let content_type = content_type_for(&file_path);

    // Missing, unreadable, and is-a-directory all collapse into 404.
    let read_result = web::block(move || std::fs::read(&file_path)).await;
    match read_result {
        Ok(Ok(content)) => HttpResponse::Ok().content_type(content_type).body(content),
        _ => not_found(),
    }
}

fn not_found() -> HttpResponse {
    HttpResponse::NotFound()
        .content_type("text/plain")
        .body("Not found")
}

/// Join the URL path onto the document root, keeping only normal path
/// segments so `..` and rooted components cannot escape the root.
fn resolve_path(static_dir: &Path, url_path: &str) -> Option<PathBuf> {
    let relative = if url_path == "/" {
        DEFAULT_DOCUMENT
    } else {
        url_path.trim_start_matches('/')
    };

    let mut resolved = static_dir.to_path_buf();
    for component in Path::new(relative).components() {
        match component {
            Component::Normal(segment) => resolved.push(segment),
            Component::CurDir => {}
            _ => return None,
        }
    }

    Some(resolved)
}

fn content_type_for(path: &Path) -> &'static str {
    match path.extension().and_then(|ext| ext.to_str()) {
        Some("html") => "text/html",
        Some("js") => "text/javascript",
        Some("css") => "text/css",
        _ => "text/plain",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_resolves_to_default_document() {
        let resolved = resolve_path(Path::new("public"), "/").unwrap();

        assert_eq!(resolved, Path::new("public").join("index.html"));
    }

    #[test]
    fn nested_paths_resolve_under_the_root() {
        let resolved = resolve_path(Path::new("public"), "/assets/app.js").unwrap();

        assert_eq!(resolved, Path::new("public").join("assets").join("app.js"));
    }

    #[test]
    fn parent_components_are_rejected() {
        assert_eq!(resolve_path(Path::new("public"), "/../secrets.txt"), None);
        assert_eq!(resolve_path(Path::new("public"), "/a/../../b"), None);
    }

    #[test]
    fn extension_table_matches_expected_types() {
        assert_eq!(content_type_for(Path::new("index.html")), "text/html");
        assert_eq!(content_type_for(Path::new("app.js")), "text/javascript");
        assert_eq!(content_type_for(Path::new("site.css")), "text/css");
        assert_eq!(content_type_for(Path::new("notes.txt")), "text/plain");
        assert_eq!(content_type_for(Path::new("no_extension")), "text/plain");
    }
}
