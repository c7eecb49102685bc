//! 影像URL解析
//!
//! 把源目录下的影像本地路径转换成独立文件服务器上的URL。

use mri_core::{ExportError, Result};
use std::path::{Component, Path, PathBuf};

/// 影像URL解析器
#[derive(Debug, Clone)]
pub struct UrlResolver {
    root: PathBuf,
    base_url: String,
}

impl UrlResolver {
    pub fn new(root: impl Into<PathBuf>, base_url: &str) -> Self {
        Self {
            root: root.into(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// 源目录下的相对路径，分隔符统一为 `/`
    pub fn relative_path(&self, path: &Path) -> Result<String> {
        let relative = path.strip_prefix(&self.root).map_err(|_| self.outside(path))?;

        let mut segments = Vec::new();
        for component in relative.components() {
            match component {
                Component::Normal(segment) => segments.push(segment.to_string_lossy().into_owned()),
                Component::CurDir => {}
                // `..` 可能跳出源目录
                _ => return Err(self.outside(path)),
            }
        }

        if segments.is_empty() {
            return Err(self.outside(path));
        }

        Ok(segments.join("/"))
    }

    /// 解析影像URL
    pub fn resolve(&self, path: &Path) -> Result<String> {
        let relative = self.relative_path(path)?;
        Ok(format!("{}/{}", self.base_url, relative))
    }

    fn outside(&self, path: &Path) -> ExportError {
        ExportError::OutsideRoot {
            path: path.to_path_buf(),
            root: self.root.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_under_root() {
        let resolver = UrlResolver::new("/srv/mri", "http://localhost:8000/data");
        let url = resolver
            .resolve(Path::new("/srv/mri/P1/StudyX/SeriesY/img001.ima"))
            .unwrap();
        assert_eq!(url, "http://localhost:8000/data/P1/StudyX/SeriesY/img001.ima");
    }

    #[test]
    fn test_trailing_slash_in_base_url() {
        let resolver = UrlResolver::new("/srv/mri", "http://localhost:8000/");
        let url = resolver.resolve(Path::new("/srv/mri/P1/S/X/a.ima")).unwrap();
        assert_eq!(url, "http://localhost:8000/P1/S/X/a.ima");
    }

    #[test]
    fn test_outside_root_is_error() {
        let resolver = UrlResolver::new("/srv/mri", "http://localhost:8000/data");

        let err = resolver.resolve(Path::new("/tmp/P1/S/X/a.ima")).unwrap_err();
        assert!(matches!(err, ExportError::OutsideRoot { .. }));

        let err = resolver.resolve(Path::new("/srv/mri/../etc/passwd")).unwrap_err();
        assert!(matches!(err, ExportError::OutsideRoot { .. }));

        assert!(resolver.resolve(Path::new("/srv/mri")).is_err());
    }

    #[test]
    fn test_distinct_files_get_distinct_urls() {
        let resolver = UrlResolver::new("/srv/mri", "http://h/d");
        let a = resolver.resolve(Path::new("/srv/mri/P1/S/X/img_1.ima")).unwrap();
        let b = resolver.resolve(Path::new("/srv/mri/P1/S/X_img/1.ima")).unwrap();
        let c = resolver.resolve(Path::new("/srv/mri/P2/S/X/img_1.ima")).unwrap();
        assert_ne!(a, b);
        assert_ne!(a, c);
    }
}
