//! Módulo de rasterização de PDFs
//! Usa pdfium-render para converter cada página em uma imagem JPEG comprimida

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use pdfium_render::prelude::*;
use std::fs::{self, File};
use std::io::BufWriter;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, error, info};

/// Nome fixo do PDF persistido dentro da pasta de saída.
/// Só há uma conversão em andamento por pasta; o arquivo é sobrescrito.
pub const UPLOAD_FILE_NAME: &str = "uploaded.pdf";

/// Parâmetros de renderização de uma conversão
#[derive(Debug, Clone)]
pub struct RenderOptions {
    /// Resolução em DPI; a escala de renderização é dpi/72
    pub dpi: u16,
    /// Limite em pixels para o maior lado da imagem gerada
    pub max_dimension: u32,
    /// Qualidade da compressão JPEG, no intervalo [0, 95]
    pub quality: u8,
}

impl Default for RenderOptions {
    fn default() -> Self {
        Self {
            dpi: 200,
            max_dimension: 1024,
            quality: 85,
        }
    }
}

/// Falha fatal: o documento não chegou a ser aberto
#[derive(Debug, Error)]
pub enum DocumentOpenError {
    #[error("não foi possível criar a pasta de saída: {0}")]
    Workspace(#[source] std::io::Error),
    #[error("falha ao gravar o PDF enviado: {0}")]
    Persist(#[source] std::io::Error),
    #[error("falha ao abrir o documento PDF: {0}")]
    Open(#[source] PdfiumError),
}

/// Falha isolada de uma única página; as demais continuam
#[derive(Debug, Error)]
pub enum PageRenderError {
    #[error("falha ao renderizar a página: {0}")]
    Render(#[from] PdfiumError),
    #[error("falha ao codificar a imagem: {0}")]
    Encode(#[from] image::ImageError),
    #[error("falha ao gravar a imagem: {0}")]
    Io(#[from] std::io::Error),
}

/// Imagem persistida de uma página renderizada
#[derive(Debug, Clone)]
pub struct PageArtifact {
    /// Número da página começando em 1, usado no nome do arquivo
    pub ordinal: usize,
    pub path: PathBuf,
    pub width: u32,
    pub height: u32,
}

/// Resultado individual de uma página
#[derive(Debug)]
pub enum PageOutcome {
    Rendered(PageArtifact),
    Failed {
        ordinal: usize,
        error: PageRenderError,
    },
}

/// Resultado completo de uma conversão
///
/// O total de páginas vem do documento e vale mesmo quando alguma página
/// falhou; não assuma que a quantidade de imagens é igual ao total.
#[derive(Debug)]
pub struct Conversion {
    pages: Vec<PageOutcome>,
    total_pages: usize,
}

impl Conversion {
    pub fn total_pages(&self) -> usize {
        self.total_pages
    }

    /// Resultados por página, na ordem do documento
    pub fn pages(&self) -> &[PageOutcome] {
        &self.pages
    }

    /// Imagens geradas, na ordem do documento (com lacunas nas páginas que falharam)
    pub fn artifacts(&self) -> impl Iterator<Item = &PageArtifact> {
        self.pages.iter().filter_map(|outcome| match outcome {
            PageOutcome::Rendered(artifact) => Some(artifact),
            PageOutcome::Failed { .. } => None,
        })
    }

    /// Busca a imagem de uma página; `None` quando a página falhou
    pub fn artifact(&self, ordinal: usize) -> Option<&PageArtifact> {
        self.artifacts().find(|artifact| artifact.ordinal == ordinal)
    }
}

/// Nome determinístico do arquivo de uma página
pub fn page_file_name(ordinal: usize) -> String {
    format!("page_{}.jpg", ordinal)
}

/// Converte PDFs em sequências de imagens comprimidas
pub struct PdfProcessor {
    pdfium: Pdfium,
}

impl PdfProcessor {
    /// Cria uma nova instância do processador de PDF
    pub fn new() -> Result<Self, PdfiumError> {
        // Tenta carregar a biblioteca pdfium de vários locais
        let pdfium = Pdfium::new(
            Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./lib/"))
                .or_else(|_| {
                    Pdfium::bind_to_library(Pdfium::pdfium_platform_library_name_at_path("./"))
                })
                .or_else(|_| Pdfium::bind_to_system_library())?,
        );

        Ok(Self { pdfium })
    }

    /// Converte os bytes de um PDF em imagens `page_<n>.jpg` dentro de `output_dir`
    ///
    /// O PDF é persistido como `uploaded.pdf`, sobrescrevendo o de qualquer
    /// conversão anterior na mesma pasta. Uma falha na abertura do documento
    /// aborta tudo sem gerar imagem alguma; falhas de páginas individuais são
    /// registradas no resultado e a conversão segue para a próxima página.
    pub fn rasterize(
        &self,
        pdf_bytes: &[u8],
        output_dir: &Path,
        options: &RenderOptions,
    ) -> Result<Conversion, DocumentOpenError> {
        fs::create_dir_all(output_dir).map_err(DocumentOpenError::Workspace)?;

        let pdf_path = output_dir.join(UPLOAD_FILE_NAME);
        fs::write(&pdf_path, pdf_bytes).map_err(DocumentOpenError::Persist)?;
        info!(path = %pdf_path.display(), "PDF persistido");

        // O handle é fechado pelo destrutor em qualquer caminho de saída
        let document = self
            .pdfium
            .load_pdf_from_file(&pdf_path, None)
            .map_err(DocumentOpenError::Open)?;

        let pages = document.pages();
        let total_pages = pages.len() as usize;
        info!(total_pages, "documento aberto");

        let mut outcomes = Vec::with_capacity(total_pages);
        for index in 0..total_pages {
            let ordinal = index + 1;
            match self.render_page(&pages, index as u16, output_dir, options) {
                Ok(artifact) => {
                    debug!(
                        ordinal,
                        width = artifact.width,
                        height = artifact.height,
                        "imagem da página gerada"
                    );
                    outcomes.push(PageOutcome::Rendered(artifact));
                }
                Err(page_error) => {
                    error!(ordinal, error = %page_error, "falha ao processar a página");
                    outcomes.push(PageOutcome::Failed {
                        ordinal,
                        error: page_error,
                    });
                }
            }
        }

        info!("conversão concluída; fechando o documento");
        Ok(Conversion {
            pages: outcomes,
            total_pages,
        })
    }

    fn render_page(
        &self,
        pages: &PdfPages<'_>,
        index: u16,
        output_dir: &Path,
        options: &RenderOptions,
    ) -> Result<PageArtifact, PageRenderError> {
        let ordinal = index as usize + 1;
        let page = pages.get(index)?;

        let dpi = options.dpi.max(1);
        let render_config = PdfRenderConfig::new()
            .set_target_width((page.width().value * dpi as f32 / 72.0) as i32)
            .set_maximum_height((page.height().value * dpi as f32 / 72.0) as i32);

        let bitmap = page.render_with_config(&render_config)?;
        let mut image = bitmap.as_image();

        // Reduz mantendo a proporção; nunca amplia
        if image.width().max(image.height()) > options.max_dimension {
            image = image.resize(
                options.max_dimension,
                options.max_dimension,
                FilterType::Lanczos3,
            );
        }

        let path = output_dir.join(page_file_name(ordinal));
        let file = File::create(&path)?;
        let mut encoder =
            JpegEncoder::new_with_quality(BufWriter::new(file), options.quality.clamp(1, 95));
        encoder.encode_image(&image.to_rgb8())?;

        Ok(PageArtifact {
            ordinal,
            path,
            width: image.width(),
            height: image.height(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Monta um PDF mínimo válido com uma página em branco por MediaBox informado
    fn minimal_pdf(page_sizes: &[(u32, u32)]) -> Vec<u8> {
        let mut objects: Vec<String> = Vec::new();
        objects.push("<< /Type /Catalog /Pages 2 0 R >>".to_string());

        let kids: Vec<String> = (0..page_sizes.len())
            .map(|i| format!("{} 0 R", i + 3))
            .collect();
        objects.push(format!(
            "<< /Type /Pages /Kids [{}] /Count {} >>",
            kids.join(" "),
            page_sizes.len()
        ));

        for (width, height) in page_sizes {
            objects.push(format!(
                "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 {} {}] >>",
                width, height
            ));
        }

        let mut pdf = b"%PDF-1.4\n".to_vec();
        let mut offsets = Vec::with_capacity(objects.len());
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.extend_from_slice(format!("{} 0 obj\n{}\nendobj\n", i + 1, body).as_bytes());
        }

        let xref_offset = pdf.len();
        pdf.extend_from_slice(format!("xref\n0 {}\n", objects.len() + 1).as_bytes());
        pdf.extend_from_slice(b"0000000000 65535 f \n");
        for offset in offsets {
            pdf.extend_from_slice(format!("{:010} 00000 n \n", offset).as_bytes());
        }
        pdf.extend_from_slice(
            format!(
                "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
                objects.len() + 1,
                xref_offset
            )
            .as_bytes(),
        );

        pdf
    }

    fn processor() -> PdfProcessor {
        PdfProcessor::new().expect("biblioteca pdfium disponível para os testes")
    }

    fn page_files(dir: &Path) -> Vec<String> {
        let mut names: Vec<String> = fs::read_dir(dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
            .filter(|name| name.starts_with("page_"))
            .collect();
        names.sort();
        names
    }

    #[test]
    fn three_page_document_yields_three_bounded_artifacts() {
        let dir = tempdir().unwrap();
        let pdf = minimal_pdf(&[(612, 792), (612, 792), (612, 792)]);
        let options = RenderOptions {
            dpi: 150,
            max_dimension: 500,
            quality: 80,
        };

        let conversion = processor().rasterize(&pdf, dir.path(), &options).unwrap();

        assert_eq!(conversion.total_pages(), 3);
        let artifacts: Vec<_> = conversion.artifacts().collect();
        assert_eq!(artifacts.len(), 3);

        for (i, artifact) in artifacts.iter().enumerate() {
            assert_eq!(artifact.ordinal, i + 1);
            assert_eq!(
                artifact.path.file_name().unwrap().to_string_lossy(),
                format!("page_{}.jpg", i + 1)
            );

            // O arquivo existe, decodifica e respeita o limite de tamanho
            let decoded = image::open(&artifact.path).unwrap();
            assert_eq!(decoded.width(), artifact.width);
            assert_eq!(decoded.height(), artifact.height);
            assert!(artifact.width.max(artifact.height) <= 500);
        }
    }

    #[test]
    fn pages_within_bound_keep_their_rendered_size() {
        let dir = tempdir().unwrap();
        let pdf = minimal_pdf(&[(100, 100)]);
        let options = RenderOptions {
            dpi: 72,
            max_dimension: 1024,
            quality: 85,
        };

        let conversion = processor().rasterize(&pdf, dir.path(), &options).unwrap();

        // 100 pontos a 72 DPI rendem 100 pixels; abaixo do limite, nada é reamostrado
        let artifact = conversion.artifact(1).unwrap();
        assert_eq!((artifact.width, artifact.height), (100, 100));
        let decoded = image::open(&artifact.path).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (100, 100));
    }

    #[test]
    fn invalid_bytes_abort_without_page_files() {
        let dir = tempdir().unwrap();

        let result = processor().rasterize(
            b"isto nao e um PDF",
            dir.path(),
            &RenderOptions::default(),
        );

        assert!(matches!(result, Err(DocumentOpenError::Open(_))));
        assert!(page_files(dir.path()).is_empty());
    }

    #[test]
    fn failed_page_leaves_a_gap_without_aborting() {
        let dir = tempdir().unwrap();
        let pdf = minimal_pdf(&[(200, 200), (200, 200), (200, 200)]);

        // Ocupa o caminho da página 2 com um diretório para forçar a falha de gravação
        fs::create_dir(dir.path().join(page_file_name(2))).unwrap();

        let conversion = processor()
            .rasterize(&pdf, dir.path(), &RenderOptions::default())
            .unwrap();

        assert_eq!(conversion.total_pages(), 3);
        assert!(conversion.artifact(1).is_some());
        assert!(conversion.artifact(2).is_none());
        assert!(conversion.artifact(3).is_some());
        assert!(matches!(
            conversion.pages()[1],
            PageOutcome::Failed { ordinal: 2, .. }
        ));
    }

    #[test]
    fn reconversion_overwrites_the_previous_upload() {
        let dir = tempdir().unwrap();
        let pdf = minimal_pdf(&[(300, 400), (300, 400)]);
        let options = RenderOptions::default();
        let processor = processor();

        let first = processor.rasterize(&pdf, dir.path(), &options).unwrap();
        let second = processor.rasterize(&pdf, dir.path(), &options).unwrap();

        assert_eq!(first.total_pages(), second.total_pages());
        for (a, b) in first.artifacts().zip(second.artifacts()) {
            assert_eq!(a.ordinal, b.ordinal);
            assert_eq!((a.width, a.height), (b.width, b.height));
        }

        // O handle foi fechado: o PDF persistido pode ser removido imediatamente
        fs::remove_file(dir.path().join(UPLOAD_FILE_NAME)).unwrap();
    }
}
