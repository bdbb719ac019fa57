//! Uploaded post images.

use std::{io, path::Path};

use image::ImageFormat;
use rocket::{
    fs::TempFile,
    tokio::{
        fs,
        io::{AsyncReadExt, AsyncWriteExt},
    },
};
use uuid::Uuid;

/// Subdirectory of the media root holding post images.
pub const UPLOAD_DIR: &str = "posts";

const ACCEPTED: [ImageFormat; 5] = [
    ImageFormat::Jpeg,
    ImageFormat::Png,
    ImageFormat::Gif,
    ImageFormat::WebP,
    ImageFormat::Bmp,
];

/// A validated image waiting to be written.
#[derive(Debug)]
pub struct ImageUpload {
    pub stem: String,
    pub format: ImageFormat,
    pub bytes: Vec<u8>,
}

/// Recognizes an accepted image format by its leading bytes.
pub fn detect_image(bytes: &[u8]) -> Option<ImageFormat> {
    image::guess_format(bytes)
        .ok()
        .filter(|format| ACCEPTED.contains(format))
}

/// What a submitted file field turned out to contain.
#[derive(Debug)]
pub enum Inspected {
    /// Empty file field
    Missing,
    NotAnImage,
    Image(ImageUpload),
}

/// Reads the submitted file and checks that it is an accepted image.
pub async fn inspect(file: &TempFile<'_>) -> std::io::Result<Inspected> {
    if file.len() == 0 {
        return Ok(Inspected::Missing);
    }

    let mut bytes = Vec::with_capacity(file.len() as usize);
    let reader = file.open().await?;
    rocket::tokio::pin!(reader);
    reader.read_to_end(&mut bytes).await?;

    let Some(format) = detect_image(&bytes) else {
        return Ok(Inspected::NotAnImage);
    };

    let stem = file
        .name()
        .filter(|name| !name.is_empty())
        .unwrap_or("image")
        .to_owned();

    Ok(Inspected::Image(ImageUpload {
        stem,
        format,
        bytes,
    }))
}

/// Writes the image under the media root and returns its stored name,
/// like `posts/cat.jpg`. Existing files are never overwritten.
pub async fn store(media_root: &Path, upload: &ImageUpload) -> std::io::Result<String> {
    let dir = media_root.join(UPLOAD_DIR);
    fs::create_dir_all(&dir).await?;

    let extension = upload.format.extensions_str().first().copied().unwrap_or("img");
    let mut file_name = format!("{}.{extension}", upload.stem);
    let mut file = loop {
        let opened = fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(dir.join(&file_name))
            .await;
        match opened {
            Ok(file) => break file,
            Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                let suffix = Uuid::new_v4().simple().to_string();
                file_name = format!("{}_{}.{extension}", upload.stem, &suffix[..7]);
            }
            Err(e) => return Err(e),
        }
    };

    file.write_all(&upload.bytes).await?;
    file.flush().await?;
    Ok(format!("{UPLOAD_DIR}/{file_name}"))
}

/// Public URL of a stored image.
pub fn media_url(stored: &str) -> String {
    format!("/media/{stored}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const GIF: &[u8] = b"GIF89a\x02\x00\x01\x00\x80\x00\x00\x00\x00\x00\xff\xff\xff!\xf9\x04\x00\x00\x00\x00\x00,\x00\x00\x00\x00\x02\x00\x01\x00\x00\x02\x02\x0c\n\x00;";

    #[test]
    fn recognizes_images_by_content() {
        assert_eq!(detect_image(GIF), Some(ImageFormat::Gif));
        assert_eq!(
            detect_image(b"\xff\xd8\xff\xe0\x00\x10JFIF\x00"),
            Some(ImageFormat::Jpeg)
        );
        assert_eq!(detect_image(b"file_content"), None);
    }

    #[rocket::async_test]
    async fn stored_names_do_not_collide() {
        let root = tempfile::tempdir().unwrap();
        let upload = ImageUpload {
            stem: "small".into(),
            format: ImageFormat::Gif,
            bytes: GIF.to_vec(),
        };

        let first = store(root.path(), &upload).await.unwrap();
        let second = store(root.path(), &upload).await.unwrap();

        assert_eq!(first, "posts/small.gif");
        assert_ne!(first, second);
        assert!(second.starts_with("posts/small_"));
        assert_eq!(std::fs::read(root.path().join(&second)).unwrap(), GIF);
    }

    #[rocket::async_test]
    async fn concurrent_uploads_keep_every_file() {
        let root = tempfile::tempdir().unwrap();
        let upload = ImageUpload {
            stem: "race".into(),
            format: ImageFormat::Gif,
            bytes: GIF.to_vec(),
        };

        let (a, b, c) = rocket::tokio::join!(
            store(root.path(), &upload),
            store(root.path(), &upload),
            store(root.path(), &upload),
        );
        let mut names = vec![a.unwrap(), b.unwrap(), c.unwrap()];
        names.sort();
        names.dedup();

        assert_eq!(names.len(), 3);
        assert_eq!(std::fs::read_dir(root.path().join(UPLOAD_DIR)).unwrap().count(), 3);
    }
}
