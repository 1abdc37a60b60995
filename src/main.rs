//! PDF Flip Book - Visualizador de PDFs como sequência de imagens
//!
//! Aplicação desktop que converte cada página de um PDF em uma imagem JPEG
//! comprimida e permite folhear o resultado com navegação e miniaturas

mod pdf_processor;
mod workspace;

use anyhow::{Context as _, Result};
use eframe::egui;
use pdf_processor::{Conversion, PageArtifact, PageOutcome, PdfProcessor, RenderOptions};
use std::collections::HashMap;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::thread;
use workspace::Workspace;

// Paleta de cores (Dark Theme First)
struct AppColors;

impl AppColors {
    // Fundo principal (tons quentes de leitura)
    const BG_MAIN: egui::Color32 = egui::Color32::from_rgb(20, 17, 15);

    // Cor primária (Amber 400)
    const PRIMARY: egui::Color32 = egui::Color32::from_rgb(251, 191, 36);

    // Erro (Soft Red)
    const ERROR: egui::Color32 = egui::Color32::from_rgb(248, 113, 113);
    const ERROR_BG: egui::Color32 = egui::Color32::from_rgb(69, 10, 10);

    // Neutros
    const TEXT_PRIMARY: egui::Color32 = egui::Color32::from_rgb(245, 241, 235);
    const TEXT_SECONDARY: egui::Color32 = egui::Color32::from_rgb(168, 158, 145);

    const CARD_BG: egui::Color32 = egui::Color32::from_rgb(38, 33, 29);
    const CARD_BORDER: egui::Color32 = egui::Color32::from_rgb(66, 58, 50);

    const PROGRESS_BG: egui::Color32 = egui::Color32::from_rgb(66, 58, 50);
}

fn main() -> eframe::Result<()> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_inner_size([1080.0, 760.0])
            .with_min_inner_size([820.0, 600.0])
            .with_title("PDF Flip Book")
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(
        "PDF Flip Book",
        options,
        Box::new(|cc| {
            let mut style = (*cc.egui_ctx.style()).clone();

            // Forçar Dark Mode
            style.visuals = egui::Visuals::dark();
            style.visuals.window_fill = AppColors::BG_MAIN;
            style.visuals.panel_fill = AppColors::BG_MAIN;

            // Espaçamento e Layout
            style.spacing.item_spacing = egui::vec2(12.0, 12.0);
            style.spacing.button_padding = egui::vec2(18.0, 10.0);

            // Cores globais
            style.visuals.widgets.noninteractive.fg_stroke.color = AppColors::TEXT_PRIMARY;
            style.visuals.hyperlink_color = AppColors::PRIMARY;

            // Fontes
            style.text_styles.insert(
                egui::TextStyle::Heading,
                egui::FontId::new(26.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Body,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );
            style.text_styles.insert(
                egui::TextStyle::Button,
                egui::FontId::new(15.0, egui::FontFamily::Proportional),
            );

            cc.egui_ctx.set_style(style);

            Ok(Box::new(FlipbookApp::default()))
        }),
    )
}

/// Onde a pasta de trabalho da conversão é criada
#[derive(Clone, Default, PartialEq)]
enum WorkspaceChoice {
    #[default]
    SystemTemp,
    CustomDir,
}

/// Uma conversão concluída: a pasta com os artefatos e o resultado
struct Session {
    workspace: Workspace,
    conversion: Conversion,
}

#[derive(Default, Clone)]
struct AppStatus {
    message: String,
    progress: f32,
    is_error: bool,
}

struct FlipbookApp {
    pdf_path: Option<PathBuf>,
    workspace_choice: WorkspaceChoice,
    custom_parent: Option<PathBuf>,
    session: Arc<Mutex<Option<Session>>>,
    status: Arc<Mutex<AppStatus>>,
    is_converting: Arc<Mutex<bool>>,
    /// Cursor da página atual, sempre dentro de [1, total_pages]
    page_number: usize,
    textures: HashMap<usize, egui::TextureHandle>,
}

impl Default for FlipbookApp {
    fn default() -> Self {
        Self {
            pdf_path: None,
            workspace_choice: WorkspaceChoice::default(),
            custom_parent: None,
            session: Arc::new(Mutex::new(None)),
            status: Arc::new(Mutex::new(AppStatus::default())),
            is_converting: Arc::new(Mutex::new(false)),
            page_number: 1,
            textures: HashMap::new(),
        }
    }
}

impl eframe::App for FlipbookApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if *self.is_converting.lock().unwrap() {
            ctx.request_repaint();
        }

        let is_converting = *self.is_converting.lock().unwrap();
        let status = self.status.lock().unwrap().clone();

        self.sidebar(ctx, is_converting);

        let session_arc = Arc::clone(&self.session);
        let showed_viewer = {
            let session_guard = session_arc.lock().unwrap();
            match session_guard.as_ref() {
                Some(session) if !is_converting => {
                    self.thumbnail_panel(ctx, session);
                    self.viewer_panel(ctx, session, &status);
                    true
                }
                _ => false,
            }
        };

        if !showed_viewer {
            self.welcome_panel(ctx, is_converting, &status);
        }
    }
}

impl FlipbookApp {
    /// Painel lateral: escolha do arquivo, pasta de trabalho e limpeza
    fn sidebar(&mut self, ctx: &egui::Context, is_converting: bool) {
        egui::SidePanel::left("configuracoes")
            .resizable(false)
            .default_width(240.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.label(
                    egui::RichText::new("📄 PDF Flip Book")
                        .size(20.0)
                        .color(AppColors::PRIMARY)
                        .strong(),
                );
                ui.add_space(8.0);
                ui.separator();

                ui.label(egui::RichText::new("Arquivo").strong());
                if ui
                    .add_enabled(!is_converting, egui::Button::new("📂 Escolher PDF"))
                    .clicked()
                {
                    self.select_pdf();
                }
                if let Some(path) = &self.pdf_path {
                    ui.label(
                        egui::RichText::new(path.file_name().unwrap_or_default().to_string_lossy())
                            .monospace()
                            .color(AppColors::TEXT_PRIMARY),
                    );
                }
                let can_convert = self.pdf_path.is_some() && !is_converting;
                if ui
                    .add_enabled(
                        can_convert,
                        egui::Button::new(
                            egui::RichText::new("▶ Converter").color(egui::Color32::BLACK),
                        )
                        .fill(AppColors::PRIMARY),
                    )
                    .clicked()
                {
                    self.start_conversion(ctx.clone());
                }

                ui.add_space(8.0);
                ui.separator();

                ui.label(egui::RichText::new("Pasta de trabalho").strong());
                ui.radio_value(
                    &mut self.workspace_choice,
                    WorkspaceChoice::SystemTemp,
                    "Temporária do sistema",
                );
                ui.radio_value(
                    &mut self.workspace_choice,
                    WorkspaceChoice::CustomDir,
                    "Pasta personalizada",
                );
                if self.workspace_choice == WorkspaceChoice::CustomDir {
                    if ui.button("Escolher pasta...").clicked() {
                        if let Some(dir) = rfd::FileDialog::new().pick_folder() {
                            self.custom_parent = Some(dir);
                        }
                    }
                    if let Some(dir) = &self.custom_parent {
                        ui.label(
                            egui::RichText::new(dir.display().to_string())
                                .small()
                                .color(AppColors::TEXT_SECONDARY),
                        );
                    }
                }

                // Informações da sessão atual
                let session_info = self.session.lock().unwrap().as_ref().map(|s| {
                    (
                        s.workspace.dir().display().to_string(),
                        s.workspace.log_path().display().to_string(),
                    )
                });
                if let Some((dir, log)) = session_info {
                    ui.add_space(8.0);
                    ui.separator();
                    ui.label(egui::RichText::new("Sessão").strong());
                    ui.label(
                        egui::RichText::new(format!("Pasta: {}", dir))
                            .small()
                            .color(AppColors::TEXT_SECONDARY),
                    );
                    ui.label(
                        egui::RichText::new(format!("Log: {}", log))
                            .small()
                            .color(AppColors::TEXT_SECONDARY),
                    );
                    if ui
                        .add_enabled(!is_converting, egui::Button::new("🗑 Limpar arquivos"))
                        .clicked()
                    {
                        self.clear_session();
                    }
                }
            });
    }

    /// Painel central antes de existir uma conversão (ou durante uma)
    fn welcome_panel(&mut self, ctx: &egui::Context, is_converting: bool, status: &AppStatus) {
        egui::CentralPanel::default().show(ctx, |ui| {
            ui.vertical_centered(|ui| {
                ui.set_max_width(520.0);
                ui.add_space(40.0);

                ui.label(
                    egui::RichText::new("📖 PDF Flip Book")
                        .size(32.0)
                        .color(AppColors::PRIMARY)
                        .strong(),
                );
                ui.add_space(4.0);
                ui.label(
                    egui::RichText::new("Transforme um PDF em um álbum de páginas navegável.")
                        .color(AppColors::TEXT_SECONDARY),
                );
                ui.add_space(24.0);

                let border_color = if is_converting || self.pdf_path.is_some() {
                    AppColors::PRIMARY
                } else {
                    AppColors::CARD_BORDER
                };

                let card_response = egui::Frame::group(ui.style())
                    .inner_margin(28.0)
                    .rounding(14.0)
                    .stroke(egui::Stroke::new(2.0, border_color))
                    .fill(AppColors::CARD_BG)
                    .show(ui, |ui| {
                        ui.set_min_width(ui.available_width());
                        ui.set_min_height(130.0);

                        ui.vertical_centered(|ui| {
                            if is_converting {
                                ui.spinner();
                                ui.add_space(14.0);

                                // Barra de progresso desenhada à mão
                                let w = ui.available_width();
                                let h = 8.0;
                                let (rect, _) =
                                    ui.allocate_exact_size(egui::vec2(w, h), egui::Sense::hover());

                                ui.painter().rect_filled(rect, 4.0, AppColors::PROGRESS_BG);
                                if status.progress > 0.0 {
                                    let fill_w = w * status.progress;
                                    let fill_rect =
                                        egui::Rect::from_min_size(rect.min, egui::vec2(fill_w, h));
                                    ui.painter().rect_filled(fill_rect, 4.0, AppColors::PRIMARY);
                                }

                                ui.add_space(10.0);
                                ui.label(
                                    egui::RichText::new(&status.message)
                                        .color(AppColors::TEXT_SECONDARY),
                                );
                            } else if let Some(path) = &self.pdf_path {
                                ui.label(
                                    egui::RichText::new("📄 Arquivo pronto")
                                        .size(18.0)
                                        .strong()
                                        .color(AppColors::PRIMARY),
                                );
                                ui.add_space(6.0);
                                ui.label(
                                    egui::RichText::new(
                                        path.file_name().unwrap_or_default().to_string_lossy(),
                                    )
                                    .color(AppColors::TEXT_PRIMARY),
                                );
                                ui.add_space(10.0);
                                ui.label(
                                    egui::RichText::new("Clique para trocar o arquivo")
                                        .size(12.0)
                                        .color(AppColors::TEXT_SECONDARY),
                                );
                            } else {
                                ui.label(
                                    egui::RichText::new("📂")
                                        .size(44.0)
                                        .color(AppColors::TEXT_SECONDARY),
                                );
                                ui.add_space(12.0);
                                ui.label(
                                    egui::RichText::new("Clique para selecionar um PDF")
                                        .size(17.0)
                                        .strong()
                                        .color(AppColors::TEXT_PRIMARY),
                                );
                            }
                        });
                    })
                    .response;

                if !is_converting {
                    if card_response.hovered() {
                        ui.ctx().set_cursor_icon(egui::CursorIcon::PointingHand);
                    }
                    if card_response.interact(egui::Sense::click()).clicked() {
                        self.select_pdf();
                    }
                }

                if status.is_error && !is_converting {
                    ui.add_space(14.0);
                    egui::Frame::none()
                        .fill(AppColors::ERROR_BG)
                        .inner_margin(12.0)
                        .rounding(8.0)
                        .show(ui, |ui| {
                            ui.label(
                                egui::RichText::new(format!("Erro: {}", status.message))
                                    .color(AppColors::ERROR),
                            );
                        });
                }
            });
        });
    }

    /// Painel central com a página atual e a navegação
    fn viewer_panel(&mut self, ctx: &egui::Context, session: &Session, status: &AppStatus) {
        let total = session.conversion.total_pages();
        if total > 0 {
            self.page_number = self.page_number.clamp(1, total);
        }

        egui::CentralPanel::default().show(ctx, |ui| {
            if total == 0 {
                ui.vertical_centered(|ui| {
                    ui.add_space(40.0);
                    ui.label(
                        egui::RichText::new("O documento não tem páginas.")
                            .color(AppColors::TEXT_SECONDARY),
                    );
                });
                return;
            }

            ui.add_space(6.0);
            ui.columns(3, |cols| {
                cols[0].vertical_centered_justified(|ui| {
                    if ui
                        .add_enabled(self.page_number > 1, egui::Button::new("⬅ Anterior"))
                        .clicked()
                    {
                        self.page_number -= 1;
                    }
                });
                cols[1].vertical_centered(|ui| {
                    ui.label(
                        egui::RichText::new(format!("Página {} de {}", self.page_number, total))
                            .strong()
                            .color(AppColors::TEXT_PRIMARY),
                    );
                    if !status.message.is_empty() {
                        ui.label(
                            egui::RichText::new(&status.message)
                                .small()
                                .color(AppColors::TEXT_SECONDARY),
                        );
                    }
                });
                cols[2].vertical_centered_justified(|ui| {
                    if ui
                        .add_enabled(self.page_number < total, egui::Button::new("Próxima ➡"))
                        .clicked()
                    {
                        self.page_number += 1;
                    }
                });
            });
            ui.separator();

            match session.conversion.artifact(self.page_number) {
                Some(artifact) => {
                    if let Some(texture) = self.texture_for(ctx, artifact) {
                        ui.vertical_centered(|ui| {
                            let avail = ui.available_size();
                            let size = texture.size_vec2();
                            let scale = (avail.x / size.x).min(avail.y / size.y).min(1.0);
                            ui.add(egui::Image::new(&texture).fit_to_exact_size(size * scale));
                        });
                    } else {
                        self.unavailable_page(ui, self.page_number);
                    }
                }
                None => self.unavailable_page(ui, self.page_number),
            }
        });
    }

    fn unavailable_page(&self, ui: &mut egui::Ui, ordinal: usize) {
        ui.vertical_centered(|ui| {
            ui.add_space(40.0);
            egui::Frame::none()
                .fill(AppColors::ERROR_BG)
                .inner_margin(16.0)
                .rounding(8.0)
                .show(ui, |ui| {
                    ui.label(
                        egui::RichText::new(format!("Página {} indisponível", ordinal))
                            .color(AppColors::ERROR),
                    );
                    ui.label(
                        egui::RichText::new("Consulte o pdf_flipbook.log na pasta de trabalho.")
                            .small()
                            .color(AppColors::TEXT_SECONDARY),
                    );
                });
        });
    }

    /// Painel direito com as miniaturas para salto direto
    fn thumbnail_panel(&mut self, ctx: &egui::Context, session: &Session) {
        egui::SidePanel::right("miniaturas")
            .resizable(false)
            .default_width(180.0)
            .show(ctx, |ui| {
                ui.add_space(10.0);
                ui.label(egui::RichText::new("Miniaturas").strong());
                ui.separator();

                egui::ScrollArea::vertical().show(ui, |ui| {
                    for outcome in session.conversion.pages() {
                        match outcome {
                            PageOutcome::Rendered(artifact) => {
                                if let Some(texture) = self.texture_for(ctx, artifact) {
                                    let size = texture.size_vec2();
                                    let thumb = size * (140.0 / size.x).min(1.0);
                                    let selected = artifact.ordinal == self.page_number;
                                    let button = egui::ImageButton::new(
                                        egui::Image::new(&texture).fit_to_exact_size(thumb),
                                    )
                                    .selected(selected);
                                    if ui.add(button).clicked() {
                                        self.page_number = artifact.ordinal;
                                    }
                                }
                                ui.label(
                                    egui::RichText::new(format!("{}", artifact.ordinal))
                                        .small()
                                        .color(AppColors::TEXT_SECONDARY),
                                );
                            }
                            PageOutcome::Failed { ordinal, .. } => {
                                ui.label(
                                    egui::RichText::new(format!("Página {} ✖", ordinal))
                                        .color(AppColors::ERROR),
                                );
                            }
                        }
                        ui.add_space(4.0);
                    }
                });
            });
    }

    fn select_pdf(&mut self) {
        if let Some(path) = rfd::FileDialog::new()
            .add_filter("PDF", &["pdf"])
            .pick_file()
        {
            self.pdf_path = Some(path);
            // Reseta status
            let mut status = self.status.lock().unwrap();
            status.message = String::new();
            status.is_error = false;
            status.progress = 0.0;
        }
    }

    fn clear_session(&mut self) {
        let removed = self.session.lock().unwrap().take();
        let mut status = self.status.lock().unwrap();
        if let Some(session) = removed {
            match session.workspace.clear() {
                Ok(()) => {
                    status.message = "Arquivos temporários removidos".to_string();
                    status.is_error = false;
                }
                Err(e) => {
                    status.message = format!("{e:#}");
                    status.is_error = true;
                }
            }
        }
        drop(status);
        self.page_number = 1;
        self.textures.clear();
    }

    fn start_conversion(&mut self, ctx: egui::Context) {
        let Some(pdf_path) = self.pdf_path.clone() else {
            return;
        };

        // Cada conversão recomeça do zero: cursor na página 1 e texturas descartadas
        self.page_number = 1;
        self.textures.clear();

        // Uma conversão por vez; a pasta da sessão anterior é descartada
        if let Some(old) = self.session.lock().unwrap().take() {
            let _ = old.workspace.clear();
        }

        let choice = self.workspace_choice.clone();
        let custom_parent = self.custom_parent.clone();
        let status = Arc::clone(&self.status);
        let session_slot = Arc::clone(&self.session);
        let is_converting = Arc::clone(&self.is_converting);

        *is_converting.lock().unwrap() = true;
        {
            let mut s = status.lock().unwrap();
            s.message = "Inicializando...".to_string();
            s.progress = 0.0;
            s.is_error = false;
        }

        thread::spawn(move || {
            let result = convert_pdf(&pdf_path, &choice, custom_parent.as_deref(), &status, &ctx);

            *is_converting.lock().unwrap() = false;

            let mut status_guard = status.lock().unwrap();
            match result {
                Ok(session) => {
                    let rendered = session.conversion.artifacts().count();
                    status_guard.message = if rendered == session.conversion.total_pages() {
                        String::new()
                    } else {
                        format!(
                            "{} de {} páginas geradas",
                            rendered,
                            session.conversion.total_pages()
                        )
                    };
                    status_guard.progress = 1.0;
                    status_guard.is_error = false;
                    *session_slot.lock().unwrap() = Some(session);
                }
                Err(e) => {
                    status_guard.message = format!("{e:#}");
                    status_guard.is_error = true;
                }
            }
            ctx.request_repaint();
        });
    }

    /// Carrega (ou reaproveita) a textura de uma página
    fn texture_for(
        &mut self,
        ctx: &egui::Context,
        artifact: &PageArtifact,
    ) -> Option<egui::TextureHandle> {
        if let Some(texture) = self.textures.get(&artifact.ordinal) {
            return Some(texture.clone());
        }

        match load_page_texture(ctx, artifact) {
            Ok(texture) => {
                self.textures.insert(artifact.ordinal, texture.clone());
                Some(texture)
            }
            Err(e) => {
                println!(
                    "[FlipBook] Falha ao carregar a página {}: {e:#}",
                    artifact.ordinal
                );
                None
            }
        }
    }
}

fn load_page_texture(ctx: &egui::Context, artifact: &PageArtifact) -> Result<egui::TextureHandle> {
    let image = image::open(&artifact.path)
        .with_context(|| format!("não foi possível ler {}", artifact.path.display()))?
        .to_rgba8();

    let size = [image.width() as usize, image.height() as usize];
    let pixels = egui::ColorImage::from_rgba_unmultiplied(size, image.as_raw());

    Ok(ctx.load_texture(
        format!("page_{}", artifact.ordinal),
        pixels,
        egui::TextureOptions::LINEAR,
    ))
}

fn convert_pdf(
    pdf_path: &Path,
    choice: &WorkspaceChoice,
    custom_parent: Option<&Path>,
    status: &Arc<Mutex<AppStatus>>,
    ctx: &egui::Context,
) -> Result<Session> {
    println!("\n========================================");
    println!("[FlipBook] Iniciando conversão de {:?}", pdf_path);

    set_status(status, ctx, "Preparando a pasta de trabalho...", 0.05);

    let workspace = match (choice, custom_parent) {
        (WorkspaceChoice::CustomDir, Some(parent)) => match Workspace::in_dir(parent) {
            Ok(workspace) => workspace,
            Err(e) => {
                // Sem a pasta escolhida, cai na temporária do sistema
                println!(
                    "[FlipBook] Pasta personalizada indisponível ({e:#}); usando a do sistema"
                );
                Workspace::system_temp()?
            }
        },
        _ => Workspace::system_temp()?,
    };
    println!("[FlipBook] Pasta de trabalho: {:?}", workspace.dir());

    set_status(status, ctx, "Lendo o arquivo...", 0.1);
    let pdf_bytes = fs::read(pdf_path)
        .with_context(|| format!("não foi possível ler {}", pdf_path.display()))?;

    set_status(status, ctx, "Carregando o renderizador...", 0.2);
    let processor = PdfProcessor::new().context(
        "Não foi possível encontrar a biblioteca PDFium. Verifique se lib/libpdfium existe.",
    )?;

    set_status(status, ctx, "Renderizando páginas...", 0.4);

    // Log restrito a esta conversão, gravado dentro da própria pasta
    let log_path = workspace.log_path();
    let log_file = File::create(&log_path)
        .with_context(|| format!("não foi possível criar {}", log_path.display()))?;
    let subscriber = tracing_subscriber::fmt()
        .with_ansi(false)
        .with_max_level(tracing::Level::DEBUG)
        .with_writer(Mutex::new(log_file))
        .finish();

    let conversion = tracing::subscriber::with_default(subscriber, || {
        processor.rasterize(&pdf_bytes, workspace.dir(), &RenderOptions::default())
    })?;

    println!(
        "[FlipBook] {} de {} páginas geradas",
        conversion.artifacts().count(),
        conversion.total_pages()
    );
    println!("========================================\n");

    Ok(Session {
        workspace,
        conversion,
    })
}

fn set_status(status: &Arc<Mutex<AppStatus>>, ctx: &egui::Context, message: &str, progress: f32) {
    {
        let mut s = status.lock().unwrap();
        s.message = message.to_string();
        s.progress = progress;
    }
    ctx.request_repaint();
}
