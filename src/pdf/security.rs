//! Password protection.
//!
//! `protect` encrypts with the standard security handler (revision 3,
//! RC4 128-bit) so every common viewer can open the result. `unlock` loads
//! with the user password and saves without an `/Encrypt` dictionary.

use crate::config::ToolkitConfig;
use crate::error::AxevoraError;
use crate::input::SelectedFile;
use crate::output::{derived_name, Artifact};
use crate::pdf::{run_blocking, PdfDocument};
use lopdf::encryption::{EncryptionState, EncryptionVersion, Permissions};
use lopdf::{Object, StringFormat};
use tracing::{info, warn};

/// Passwords for [`protect_pdf`].
#[derive(Clone)]
pub struct ProtectOptions {
    /// Needed to open the document.
    pub user_password: String,
    /// Grants full permissions. Defaults to the user password.
    pub owner_password: Option<String>,
}

impl std::fmt::Debug for ProtectOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProtectOptions")
            .field("user_password", &"<redacted>")
            .field("owner_password", &self.owner_password.as_ref().map(|_| "<redacted>"))
            .finish()
    }
}

impl ProtectOptions {
    pub fn new(user_password: impl Into<String>) -> Self {
        Self {
            user_password: user_password.into(),
            owner_password: None,
        }
    }

    pub fn with_owner_password(mut self, owner: impl Into<String>) -> Self {
        self.owner_password = Some(owner.into());
        self
    }
}

/// Encrypt a PDF so it needs `options.user_password` to open.
pub async fn protect_pdf(
    file: &SelectedFile,
    options: &ProtectOptions,
    config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    if options.user_password.is_empty() {
        return Err(AxevoraError::EmptyPassword);
    }
    file.require_pdf()?;

    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let open_password = config.password.clone();
    let user = options.user_password.clone();
    let owner = options
        .owner_password
        .clone()
        .filter(|o| !o.is_empty())
        .unwrap_or_else(|| user.clone());

    info!("Protecting '{}'", name);
    let out = run_blocking("protect", move || {
        let doc = PdfDocument::load_bytes(&name, &bytes, open_password.as_deref())?;
        encrypt(doc, &user, &owner)
    })
    .await?;
    Ok(Artifact::pdf(derived_name(&file.name, "protected", "pdf"), out))
}

fn encrypt(mut doc: PdfDocument, user: &str, owner: &str) -> Result<Vec<u8>, AxevoraError> {
    ensure_document_id(&mut doc);

    let state = {
        let version = EncryptionVersion::V2 {
            document: doc.lopdf(),
            owner_password: owner,
            user_password: user,
            key_length: 128,
            permissions: Permissions::all(),
        };
        EncryptionState::try_from(version)
            .map_err(|e| AxevoraError::PdfWriteFailed(format!("encryption setup: {e}")))?
    };

    doc.lopdf_mut()
        .encrypt(&state)
        .map_err(|e| AxevoraError::PdfWriteFailed(format!("encryption: {e}")))?;
    doc.to_bytes()
}

/// The standard handler keys off the first trailer `/ID` entry.
fn ensure_document_id(doc: &mut PdfDocument) {
    let trailer = &mut doc.lopdf_mut().trailer;
    if trailer.has(b"ID") {
        return;
    }
    let id = uuid::Uuid::new_v4().as_bytes().to_vec();
    trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );
}

/// Remove password protection using `password`.
pub async fn unlock_pdf(
    file: &SelectedFile,
    password: &str,
    _config: &ToolkitConfig,
) -> Result<Artifact, AxevoraError> {
    if password.is_empty() {
        return Err(AxevoraError::EmptyPassword);
    }
    file.require_pdf()?;

    let name = file.name.clone();
    let bytes = file.bytes.clone();
    let password = password.to_string();
    let out = run_blocking("unlock", move || {
        let doc = PdfDocument::load_bytes(&name, &bytes, Some(&password))?;
        if !doc.was_encrypted() {
            warn!("'{}' is not encrypted; saving unchanged", name);
        }
        doc.to_bytes()
    })
    .await?;
    info!("Unlocked '{}'", file.name);
    Ok(Artifact::pdf(derived_name(&file.name, "unlocked", "pdf"), out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdf::document::test_support::numbered_pdf_bytes;

    fn pdf() -> SelectedFile {
        SelectedFile::from_bytes("doc.pdf", numbered_pdf_bytes(2))
    }

    #[tokio::test]
    async fn empty_password_rejected() {
        let config = ToolkitConfig::default();
        let err = protect_pdf(&pdf(), &ProtectOptions::new(""), &config)
            .await
            .unwrap_err();
        assert!(matches!(err, AxevoraError::EmptyPassword));
        let err = unlock_pdf(&pdf(), "", &config).await.unwrap_err();
        assert!(matches!(err, AxevoraError::EmptyPassword));
    }

    #[tokio::test]
    async fn protected_file_needs_password() {
        let config = ToolkitConfig::default();
        let out = protect_pdf(&pdf(), &ProtectOptions::new("s3cret"), &config)
            .await
            .unwrap();
        assert_eq!(out.file_name, "doc-protected.pdf");

        let err = PdfDocument::load_bytes("p.pdf", &out.bytes, None).unwrap_err();
        assert!(matches!(err, AxevoraError::PasswordRequired { .. }));
    }

    #[tokio::test]
    async fn protected_file_opens_with_its_password() {
        let config = ToolkitConfig::default();
        let out = protect_pdf(&pdf(), &ProtectOptions::new("s3cret"), &config)
            .await
            .unwrap();

        let doc = PdfDocument::load_bytes("p.pdf", &out.bytes, Some("s3cret")).unwrap();
        assert!(doc.was_encrypted());
        assert_eq!(doc.page_count(), 2);
        let widths: Vec<i64> = doc.page_sizes().iter().map(|(w, _)| *w as i64).collect();
        assert_eq!(widths, vec![100, 101]);
        assert!(doc.page_text(0).unwrap().contains("Page 1"));

        let err = PdfDocument::load_bytes("p.pdf", &out.bytes, Some("nope")).unwrap_err();
        assert!(matches!(err, AxevoraError::WrongPassword { .. }));
    }

    #[tokio::test]
    async fn unlock_restores_a_plain_document() {
        let config = ToolkitConfig::default();
        let locked = protect_pdf(&pdf(), &ProtectOptions::new("pw"), &config)
            .await
            .unwrap();
        let locked = SelectedFile::from_bytes("doc-protected.pdf", locked.bytes);

        let out = unlock_pdf(&locked, "pw", &config).await.unwrap();
        assert_eq!(out.file_name, "doc-protected-unlocked.pdf");
        let doc = PdfDocument::load_bytes("u.pdf", &out.bytes, None).unwrap();
        assert!(!doc.was_encrypted());
        assert_eq!(doc.page_count(), 2);
    }

    #[tokio::test]
    async fn protect_reencrypts_a_locked_input() {
        let locked = protect_pdf(&pdf(), &ProtectOptions::new("old"), &ToolkitConfig::default())
            .await
            .unwrap();
        let locked = SelectedFile::from_bytes("doc.pdf", locked.bytes);
        let config = ToolkitConfig::builder().password("old").build().unwrap();

        let out = protect_pdf(&locked, &ProtectOptions::new("new"), &config)
            .await
            .unwrap();
        let doc = PdfDocument::load_bytes("p.pdf", &out.bytes, Some("new")).unwrap();
        assert_eq!(doc.page_count(), 2);
    }

    #[test]
    fn debug_hides_passwords() {
        let opts = ProtectOptions::new("a").with_owner_password("b");
        let dbg = format!("{opts:?}");
        assert!(!dbg.contains("\"a\""));
        assert!(!dbg.contains("\"b\""));
    }
}
