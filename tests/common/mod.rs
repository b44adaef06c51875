#![allow(dead_code)]

use bytes::Bytes;
use image::{DynamicImage, ImageFormat, Rgba, RgbaImage};
use std::io::Cursor;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use icon_proxy::cache::MemoryCacheStore;
use icon_proxy::config::Config;
use icon_proxy::service::IconService;

/// Solid-colour PNG of the given dimensions
pub fn png(width: u32, height: u32, colour: [u8; 4]) -> Bytes {
    let img = DynamicImage::ImageRgba8(RgbaImage::from_pixel(width, height, Rgba(colour)));
    let mut buf = Vec::new();
    img.write_to(&mut Cursor::new(&mut buf), ImageFormat::Png)
        .unwrap();
    Bytes::from(buf)
}

pub fn dimensions(png: &[u8]) -> (u32, u32) {
    let img = image::load_from_memory(png).unwrap();
    (img.width(), img.height())
}

/// Defaults with fast timeouts and a private letter directory
pub fn test_config(letter_dir: &Path) -> Config {
    let mut config = Config::default();
    config.fetch.timeout = Duration::from_secs(5);
    config.fetch.connect_timeout = Duration::from_secs(2);
    config.letters.directory = letter_dir.to_path_buf();
    config
}

/// Client that talks to local mock servers directly
pub fn direct_client() -> reqwest::Client {
    reqwest::Client::builder().no_proxy().build().unwrap()
}

/// Client whose every request fails to connect
pub fn offline_client() -> reqwest::Client {
    reqwest::Client::builder()
        .proxy(reqwest::Proxy::all("http://127.0.0.1:9").unwrap())
        .connect_timeout(Duration::from_secs(2))
        .build()
        .unwrap()
}

pub fn service_with(config: Config, client: reqwest::Client) -> Arc<IconService> {
    let store = Arc::new(MemoryCacheStore::new(config.cache.capacity).unwrap());
    Arc::new(IconService::with_components(config, client, store).unwrap())
}

pub fn html_page(links: &[(&str, &str, Option<&str>)]) -> String {
    let mut head = String::new();
    for (rel, href, sizes) in links {
        match sizes {
            Some(sizes) => head.push_str(&format!(
                "<link rel=\"{rel}\" href=\"{href}\" sizes=\"{sizes}\">\n"
            )),
            None => head.push_str(&format!("<link rel=\"{rel}\" href=\"{href}\">\n")),
        }
    }
    format!("<!doctype html><html><head><title>t</title>\n{head}</head><body></body></html>")
}
