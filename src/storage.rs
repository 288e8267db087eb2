use std::{io, path::PathBuf};

use tokio::fs;
use uuid::Uuid;

/// Filesystem store for uploaded submission files.
///
/// Files land under `{root}/{group}/{task}/{submission}/{name}` and are
/// referenced from submission rows by the path relative to the root.
#[derive(Clone, Debug)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    #[must_use]
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub async fn store_submission(
        &self,
        group_id: Uuid,
        task_id: Uuid,
        submission_id: Uuid,
        file_name: Option<&str>,
        bytes: &[u8],
    ) -> io::Result<String> {
        let name = sanitize_file_name(file_name);
        let dir = self
            .root
            .join(group_id.to_string())
            .join(task_id.to_string())
            .join(submission_id.to_string());

        fs::create_dir_all(&dir).await?;
        fs::write(dir.join(name), bytes).await?;

        Ok(format!("{group_id}/{task_id}/{submission_id}/{name}"))
    }
}

/// Reduce a client-supplied file name to its final path component.
fn sanitize_file_name(file_name: Option<&str>) -> &str {
    file_name
        .and_then(|name| name.rsplit(['/', '\\']).next())
        .filter(|name| !name.is_empty() && *name != "." && *name != "..")
        .unwrap_or("upload.bin")
}

#[cfg(test)]
mod tests {
    #![allow(clippy::unwrap_used)]

    use super::*;

    #[test]
    fn file_names_lose_their_directories() {
        assert_eq!(sanitize_file_name(Some("report.txt")), "report.txt");
        assert_eq!(sanitize_file_name(Some("a/b/report.txt")), "report.txt");
        assert_eq!(sanitize_file_name(Some("..\\evil.sh")), "evil.sh");
        assert_eq!(sanitize_file_name(Some("")), "upload.bin");
        assert_eq!(sanitize_file_name(Some("..")), "upload.bin");
        assert_eq!(sanitize_file_name(None), "upload.bin");
    }

    #[tokio::test]
    async fn stored_files_stay_under_the_root() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().to_path_buf());

        let (group, task, submission) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());
        let rel = store
            .store_submission(group, task, submission, Some("../escape.txt"), b"data")
            .await
            .unwrap();

        assert_eq!(rel, format!("{group}/{task}/{submission}/escape.txt"));
        let on_disk = dir.path().join(&rel);
        assert_eq!(std::fs::read(on_disk).unwrap(), b"data");
    }
}
