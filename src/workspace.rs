//! Pasta de trabalho de uma sessão de conversão
//! Guarda o PDF enviado, as imagens das páginas e o log da conversão

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};

/// Nome do arquivo de log gravado ao lado das imagens
pub const LOG_FILE_NAME: &str = "pdf_flipbook.log";

/// Pasta onde uma conversão grava seus artefatos
#[derive(Debug)]
pub struct Workspace {
    dir: PathBuf,
}

impl Workspace {
    /// Cria uma pasta nova dentro do diretório temporário do sistema
    pub fn system_temp() -> Result<Self> {
        let dir = tempfile::Builder::new()
            .prefix("pdf_flipbook_")
            .tempdir()
            .context("falha ao criar a pasta temporária")?
            // A pasta persiste até o usuário pedir a limpeza
            .into_path();

        Ok(Self { dir })
    }

    /// Cria uma pasta nova dentro de um diretório escolhido pelo usuário
    pub fn in_dir(parent: &Path) -> Result<Self> {
        let dir = parent.join(format!("pdf_flipbook_{}", std::process::id()));
        fs::create_dir_all(&dir)
            .with_context(|| format!("não foi possível criar a pasta {}", dir.display()))?;

        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Caminho do log desta sessão
    pub fn log_path(&self) -> PathBuf {
        self.dir.join(LOG_FILE_NAME)
    }

    /// Remove a pasta e tudo que foi gerado dentro dela
    pub fn clear(self) -> Result<()> {
        fs::remove_dir_all(&self.dir)
            .with_context(|| format!("não foi possível limpar a pasta {}", self.dir.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn system_temp_creates_a_prefixed_directory() {
        let workspace = Workspace::system_temp().unwrap();

        assert!(workspace.dir().is_dir());
        let name = workspace.dir().file_name().unwrap().to_string_lossy();
        assert!(name.starts_with("pdf_flipbook_"));

        workspace.clear().unwrap();
    }

    #[test]
    fn in_dir_nests_under_the_chosen_parent() {
        let parent = tempdir().unwrap();
        let workspace = Workspace::in_dir(parent.path()).unwrap();

        assert!(workspace.dir().starts_with(parent.path()));
        assert!(workspace.dir().is_dir());
        assert_eq!(
            workspace.log_path().file_name().unwrap().to_string_lossy(),
            LOG_FILE_NAME
        );
    }

    #[test]
    fn clear_removes_the_directory_and_its_contents() {
        let parent = tempdir().unwrap();
        let workspace = Workspace::in_dir(parent.path()).unwrap();
        fs::write(workspace.dir().join("page_1.jpg"), b"jpg").unwrap();

        let dir = workspace.dir().to_path_buf();
        workspace.clear().unwrap();

        assert!(!dir.exists());
    }
}
