use thiserror::Error;

pub type Result<T> = std::result::Result<T, NoticeError>;

#[derive(Error, Debug)]
pub enum NoticeError {
    #[error("error reading license text {path:?}: {source}")]
    LicenseText {
        path: String,
        #[source]
        source: std::io::Error,
    },
}
