use crate::stats::{EngagementLogger, Metric};
use chrono::Local;
use printpdf::*;
use std::collections::{BTreeMap, HashMap};
use std::path::{Path, PathBuf};

/// Result of generating reports for a single ad.
#[derive(Debug)]
pub struct ReportResult {
    pub ad_id: String,
    pub csv_path: PathBuf,
    pub pdf_path: PathBuf,
}

/// Result of generating a multi-ad matrix report.
#[derive(Debug)]
pub struct MultiReportResult {
    pub path: PathBuf,
    pub format: ReportFormat,
}

/// Report output format.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReportFormat {
    Csv,
    Pdf,
}

impl ReportFormat {
    pub fn from_str_loose(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "csv" => Some(Self::Csv),
            "pdf" => Some(Self::Pdf),
            _ => None,
        }
    }

    pub fn extension(&self) -> &str {
        match self {
            Self::Csv => "csv",
            Self::Pdf => "pdf",
        }
    }
}

/// Generates advertiser engagement reports from logged data.
pub struct EngagementReportGenerator<'a> {
    logger: &'a EngagementLogger,
}

/// Daily engagement entry for reports.
#[derive(Debug, Clone)]
struct DailyEntry {
    date_iso: String,
    impressions: usize,
    clicks: usize,
}

/// Hourly click entry for reports.
#[derive(Debug, Clone)]
struct HourlyEntry {
    date_iso: String,
    hour: u8,
    clicks: usize,
}

impl<'a> EngagementReportGenerator<'a> {
    pub fn new(logger: &'a EngagementLogger) -> Self {
        Self { logger }
    }

    /// Generate CSV and PDF reports for all ads with engagement in the
    /// given period. Returns one result per ad.
    pub fn generate_report(
        &self,
        start: &str,
        end: &str,
        company_name: Option<&str>,
        output_dir: &Path,
    ) -> Vec<ReportResult> {
        let daily_impressions = self.logger.get_daily_counts(Metric::Impressions, start, end);
        let daily_clicks = self.logger.get_daily_counts(Metric::Clicks, start, end);
        let hourly_clicks = self.logger.get_hourly_counts(Metric::Clicks, start, end);

        // Collect all ad ids with any engagement
        let mut ad_ids: Vec<String> = Vec::new();
        for ads in daily_impressions.values().chain(daily_clicks.values()) {
            for id in ads.keys() {
                if !ad_ids.contains(id) {
                    ad_ids.push(id.clone());
                }
            }
        }
        ad_ids.sort();

        let mut results = Vec::new();
        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();

        for ad_id in &ad_ids {
            let daily = extract_daily(ad_id, &daily_impressions, &daily_clicks);
            let hourly = extract_hourly(ad_id, &hourly_clicks);
            let total_impressions: usize = daily.iter().map(|d| d.impressions).sum();
            let total_clicks: usize = daily.iter().map(|d| d.clicks).sum();

            if total_impressions == 0 && total_clicks == 0 {
                continue;
            }

            let safe_name = sanitize_filename(ad_id);
            let csv_path = output_dir.join(format!("ENGAGEMENT_{}_{}.csv", safe_name, timestamp));
            let pdf_path = output_dir.join(format!("ENGAGEMENT_{}_{}.pdf", safe_name, timestamp));

            let csv_content =
                build_csv(ad_id, start, end, &daily, &hourly, total_impressions, total_clicks);
            let _ = std::fs::write(&csv_path, csv_content);

            let pdf_bytes = build_pdf(
                ad_id,
                start,
                end,
                company_name,
                &daily,
                &hourly,
                total_impressions,
                total_clicks,
            );
            let _ = std::fs::write(&pdf_path, pdf_bytes);

            results.push(ReportResult {
                ad_id: ad_id.clone(),
                csv_path,
                pdf_path,
            });
        }

        results
    }

    /// Generate a single-ad report (CSV + PDF). None if no engagement.
    pub fn generate_single_report(
        &self,
        ad_id: &str,
        start: &str,
        end: &str,
        company_name: Option<&str>,
        output_dir: &Path,
    ) -> Option<ReportResult> {
        let daily_impressions = self.logger.get_daily_counts(Metric::Impressions, start, end);
        let daily_clicks = self.logger.get_daily_counts(Metric::Clicks, start, end);
        let hourly_clicks = self.logger.get_hourly_counts(Metric::Clicks, start, end);

        let daily = extract_daily(ad_id, &daily_impressions, &daily_clicks);
        let hourly = extract_hourly(ad_id, &hourly_clicks);
        let total_impressions: usize = daily.iter().map(|d| d.impressions).sum();
        let total_clicks: usize = daily.iter().map(|d| d.clicks).sum();

        if total_impressions == 0 && total_clicks == 0 {
            return None;
        }

        let timestamp = Local::now().format("%Y%m%d_%H%M%S").to_string();
        let safe_name = sanitize_filename(ad_id);
        let csv_path = output_dir.join(format!("ENGAGEMENT_{}_{}.csv", safe_name, timestamp));
        let pdf_path = output_dir.join(format!("ENGAGEMENT_{}_{}.pdf", safe_name, timestamp));

        let csv_content =
            build_csv(ad_id, start, end, &daily, &hourly, total_impressions, total_clicks);
        let _ = std::fs::write(&csv_path, csv_content);

        let pdf_bytes = build_pdf(
            ad_id,
            start,
            end,
            company_name,
            &daily,
            &hourly,
            total_impressions,
            total_clicks,
        );
        let _ = std::fs::write(&pdf_path, pdf_bytes);

        Some(ReportResult {
            ad_id: ad_id.to_string(),
            csv_path,
            pdf_path,
        })
    }

    /// Generate a multi-ad daily-clicks matrix report.
    pub fn generate_multi_ad_report(
        &self,
        ad_ids: &[String],
        start: &str,
        end: &str,
        output_file: &Path,
        format: ReportFormat,
    ) -> Option<MultiReportResult> {
        let daily = self.logger.get_daily_counts(Metric::Clicks, start, end);

        let mut dates: Vec<String> = daily.keys().cloned().collect();
        dates.sort();

        if dates.is_empty() {
            return None;
        }

        // Filter to requested ids (or all if empty)
        let ids: Vec<String> = if ad_ids.is_empty() {
            let mut all: Vec<String> = Vec::new();
            for ads in daily.values() {
                for id in ads.keys() {
                    if !all.contains(id) {
                        all.push(id.clone());
                    }
                }
            }
            all.sort();
            all
        } else {
            ad_ids.to_vec()
        };

        if ids.is_empty() {
            return None;
        }

        match format {
            ReportFormat::Csv => {
                let content = build_multi_csv(&ids, &dates, &daily, start, end);
                let _ = std::fs::write(output_file, content);
            }
            ReportFormat::Pdf => {
                let bytes = build_multi_pdf(&ids, &dates, &daily, start, end);
                let _ = std::fs::write(output_file, bytes);
            }
        }

        Some(MultiReportResult {
            path: output_file.to_path_buf(),
            format,
        })
    }
}

// --- Data extraction helpers ---

fn extract_daily(
    ad_id: &str,
    impressions: &HashMap<String, HashMap<String, usize>>,
    clicks: &HashMap<String, HashMap<String, usize>>,
) -> Vec<DailyEntry> {
    let mut entries: BTreeMap<String, DailyEntry> = BTreeMap::new();

    for (date, ads) in impressions {
        if let Some(&count) = ads.get(ad_id) {
            if count > 0 {
                entries
                    .entry(date.clone())
                    .or_insert_with(|| DailyEntry {
                        date_iso: date.clone(),
                        impressions: 0,
                        clicks: 0,
                    })
                    .impressions = count;
            }
        }
    }
    for (date, ads) in clicks {
        if let Some(&count) = ads.get(ad_id) {
            if count > 0 {
                entries
                    .entry(date.clone())
                    .or_insert_with(|| DailyEntry {
                        date_iso: date.clone(),
                        impressions: 0,
                        clicks: 0,
                    })
                    .clicks = count;
            }
        }
    }

    entries.into_values().collect()
}

fn extract_hourly(
    ad_id: &str,
    hourly: &HashMap<String, HashMap<String, usize>>,
) -> Vec<HourlyEntry> {
    // hourly keys are "YYYY-MM-DD_HH"
    let mut entries: BTreeMap<String, HourlyEntry> = BTreeMap::new();

    for (key, ads) in hourly {
        if let Some(&count) = ads.get(ad_id) {
            if count > 0 {
                if let Some((date, hour_str)) = key.rsplit_once('_') {
                    let hour = hour_str.parse::<u8>().unwrap_or(0);
                    entries.insert(
                        key.clone(),
                        HourlyEntry {
                            date_iso: date.to_string(),
                            hour,
                            clicks: count,
                        },
                    );
                }
            }
        }
    }

    entries.into_values().collect()
}

// --- CSV builders ---

fn build_csv(
    ad_id: &str,
    start: &str,
    end: &str,
    daily: &[DailyEntry],
    hourly: &[HourlyEntry],
    total_impressions: usize,
    total_clicks: usize,
) -> String {
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let ctr = ctr_percent(total_impressions, total_clicks);

    let mut out = String::new();
    out.push_str("Advertiser Engagement Report\n\n");
    out.push_str(&format!("Ad: {}\n", ad_id));
    out.push_str(&format!("Report Period: {} to {}\n", start, end));
    out.push_str(&format!("Generated: {}\n", now));
    out.push_str(&format!("Total Impressions: {}\n", total_impressions));
    out.push_str(&format!("Total Clicks: {}\n", total_clicks));
    out.push_str(&format!("Click-Through Rate: {:.1}%\n", ctr));
    out.push_str("\nDAILY SUMMARY\n");
    out.push_str("Date,Impressions,Clicks\n");

    for entry in daily {
        out.push_str(&format!(
            "{},{},{}\n",
            entry.date_iso, entry.impressions, entry.clicks
        ));
    }

    out.push_str("\nHOURLY CLICKS\n");
    out.push_str("Date,Hour,Clicks\n");

    for entry in hourly {
        out.push_str(&format!(
            "{},{:02}:00,{}\n",
            entry.date_iso, entry.hour, entry.clicks
        ));
    }

    out.push_str(&format!(
        "\nGRAND TOTAL,{},{}\n",
        total_impressions, total_clicks
    ));
    out
}

fn build_multi_csv(
    ids: &[String],
    dates: &[String],
    daily: &HashMap<String, HashMap<String, usize>>,
    start: &str,
    end: &str,
) -> String {
    let mut out = String::new();
    out.push_str(&format!("Multi-Ad Click Report: {} to {}\n\n", start, end));

    out.push_str("Date");
    for id in ids {
        out.push_str(&format!(",{}", id));
    }
    out.push('\n');

    let mut totals: Vec<usize> = vec![0; ids.len()];
    for date in dates {
        out.push_str(date);
        for (i, id) in ids.iter().enumerate() {
            let count = daily.get(date).and_then(|ads| ads.get(id)).copied().unwrap_or(0);
            out.push_str(&format!(",{}", count));
            totals[i] += count;
        }
        out.push('\n');
    }

    out.push_str("TOTAL");
    for t in &totals {
        out.push_str(&format!(",{}", t));
    }
    out.push('\n');
    out
}

// --- PDF builders ---

fn build_pdf(
    ad_id: &str,
    start: &str,
    end: &str,
    company_name: Option<&str>,
    daily: &[DailyEntry],
    hourly: &[HourlyEntry],
    total_impressions: usize,
    total_clicks: usize,
) -> Vec<u8> {
    let mut doc = PdfDocument::new("Engagement Report");
    let ctr = ctr_percent(total_impressions, total_clicks);
    let days_active = daily.len();
    let now = Local::now().format("%Y-%m-%d %H:%M:%S").to_string();
    let black = rgb_black();
    let white = rgb_white();
    let hdr_bg = rgb_header_bg();
    let alt = rgb_alt_row();
    let gray = rgb_gray();

    let mut ops: Vec<Op> = Vec::new();
    let mut y = Mm(277.0);

    // Title
    let title = match company_name {
        Some(c) => format!("Advertiser Engagement Report — {}", c),
        None => "Advertiser Engagement Report".to_string(),
    };
    pdf_text(&mut ops, &title, Mm(20.0), y, BuiltinFont::HelveticaBold, Pt(16.0), &black);
    y = y - Mm(10.0);

    // Report info
    pdf_text(&mut ops, &format!("Ad: {}", ad_id), Mm(20.0), y, BuiltinFont::Helvetica, Pt(10.0), &black);
    y = y - Mm(5.0);
    pdf_text(&mut ops, &format!("Report Period: {} to {}", start, end), Mm(20.0), y, BuiltinFont::Helvetica, Pt(10.0), &black);
    y = y - Mm(5.0);
    pdf_text(&mut ops, &format!("Generated: {}", now), Mm(20.0), y, BuiltinFont::Helvetica, Pt(10.0), &black);
    y = y - Mm(8.0);

    // Summary box
    let box_top = y;
    let box_bottom = y - Mm(22.0);
    let box_fill = Rgb { r: 0.95, g: 0.95, b: 0.97, icc_profile: None };
    let box_stroke = Rgb { r: 0.7, g: 0.7, b: 0.7, icc_profile: None };
    pdf_rect_fill(&mut ops, Mm(20.0), box_bottom, Mm(170.0), box_top, &box_fill);
    pdf_rect_stroke(&mut ops, Mm(20.0), box_bottom, Mm(170.0), box_top, &box_stroke);

    y = y - Mm(5.0);
    pdf_text(
        &mut ops,
        &format!("Impressions: {}    Clicks: {}", total_impressions, total_clicks),
        Mm(25.0),
        y,
        BuiltinFont::HelveticaBold,
        Pt(10.0),
        &black,
    );
    y = y - Mm(5.0);
    pdf_text(
        &mut ops,
        &format!("Click-Through Rate: {:.1}%    Days Active: {}", ctr, days_active),
        Mm(25.0),
        y,
        BuiltinFont::Helvetica,
        Pt(9.0),
        &black,
    );
    y = box_bottom - Mm(8.0);

    // Daily summary table
    pdf_text(&mut ops, "DAILY SUMMARY", Mm(20.0), y, BuiltinFont::HelveticaBold, Pt(11.0), &black);
    y = y - Mm(6.0);

    let row_h = Mm(5.0);

    pdf_rect_fill(&mut ops, Mm(20.0), y - row_h, Mm(170.0), y, &hdr_bg);
    pdf_text(&mut ops, "Date", Mm(22.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    pdf_text(&mut ops, "Impressions", Mm(80.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    pdf_text(&mut ops, "Clicks", Mm(130.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    y = y - row_h;

    for (i, entry) in daily.iter().enumerate() {
        if y < Mm(30.0) {
            doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));
            ops = Vec::new();
            y = Mm(277.0);
        }

        if i % 2 == 0 {
            pdf_rect_fill(&mut ops, Mm(20.0), y - row_h, Mm(170.0), y, &alt);
        }
        pdf_text(&mut ops, &entry.date_iso, Mm(22.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        pdf_text(&mut ops, &entry.impressions.to_string(), Mm(80.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        pdf_text(&mut ops, &entry.clicks.to_string(), Mm(130.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        y = y - row_h;
    }

    y = y - Mm(8.0);

    // Hourly clicks table
    if y < Mm(50.0) {
        doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));
        ops = Vec::new();
        y = Mm(277.0);
    }

    pdf_text(&mut ops, "HOURLY CLICKS", Mm(20.0), y, BuiltinFont::HelveticaBold, Pt(11.0), &black);
    y = y - Mm(6.0);

    pdf_rect_fill(&mut ops, Mm(20.0), y - row_h, Mm(170.0), y, &hdr_bg);
    pdf_text(&mut ops, "Date", Mm(22.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    pdf_text(&mut ops, "Hour", Mm(80.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    pdf_text(&mut ops, "Clicks", Mm(130.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(8.0), &white);
    y = y - row_h;

    for (i, entry) in hourly.iter().enumerate() {
        if y < Mm(30.0) {
            doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));
            ops = Vec::new();
            y = Mm(277.0);
        }

        if i % 2 == 0 {
            pdf_rect_fill(&mut ops, Mm(20.0), y - row_h, Mm(170.0), y, &alt);
        }
        pdf_text(&mut ops, &entry.date_iso, Mm(22.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        pdf_text(&mut ops, &format!("{:02}:00", entry.hour), Mm(80.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        pdf_text(&mut ops, &entry.clicks.to_string(), Mm(130.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(8.0), &black);
        y = y - row_h;
    }

    // Grand total row
    y = y - Mm(2.0);
    pdf_text(
        &mut ops,
        &format!("TOTALS — impressions: {}, clicks: {}", total_impressions, total_clicks),
        Mm(22.0),
        y,
        BuiltinFont::HelveticaBold,
        Pt(10.0),
        &black,
    );

    // Footer
    pdf_text(&mut ops, "adLoop — Ad Carousel Engine", Mm(20.0), Mm(10.0), BuiltinFont::Helvetica, Pt(7.0), &gray);

    doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));

    let mut warnings = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

fn build_multi_pdf(
    ids: &[String],
    dates: &[String],
    daily: &HashMap<String, HashMap<String, usize>>,
    start: &str,
    end: &str,
) -> Vec<u8> {
    let mut doc = PdfDocument::new("Multi-Ad Click Report");
    let black = rgb_black();
    let white = rgb_white();
    let hdr_bg = rgb_header_bg();
    let alt = rgb_alt_row();
    let gray = rgb_gray();

    let mut ops: Vec<Op> = Vec::new();
    let mut y = Mm(277.0);

    // Title
    pdf_text(&mut ops, &format!("Multi-Ad Click Report: {} to {}", start, end), Mm(20.0), y, BuiltinFont::HelveticaBold, Pt(14.0), &black);
    y = y - Mm(10.0);

    // Calculate column widths
    let table_left = Mm(20.0);
    let table_right = Mm(190.0);
    let remaining: f32 = 190.0 - 20.0 - 30.0;
    let col_w = if ids.is_empty() { 30.0_f32 } else { remaining / ids.len() as f32 };
    let row_h = Mm(5.0);

    // Header row
    pdf_rect_fill(&mut ops, table_left, y - row_h, table_right, y, &hdr_bg);
    pdf_text(&mut ops, "Date", Mm(22.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(7.0), &white);

    for (i, id) in ids.iter().enumerate() {
        let x = Mm(50.0 + i as f32 * col_w);
        let display = if id.len() > 12 { &id[..12] } else { id };
        pdf_text(&mut ops, display, x, y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(7.0), &white);
    }
    y = y - row_h;

    let mut totals: Vec<usize> = vec![0; ids.len()];

    for (row_idx, date) in dates.iter().enumerate() {
        if y < Mm(30.0) {
            doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));
            ops = Vec::new();
            y = Mm(277.0);
        }

        if row_idx % 2 == 0 {
            pdf_rect_fill(&mut ops, table_left, y - row_h, table_right, y, &alt);
        }
        pdf_text(&mut ops, date, Mm(22.0), y - Mm(3.5), BuiltinFont::Helvetica, Pt(7.0), &black);

        for (i, id) in ids.iter().enumerate() {
            let count = daily.get(date).and_then(|ads| ads.get(id)).copied().unwrap_or(0);
            totals[i] += count;
            let x = Mm(50.0 + i as f32 * col_w);
            pdf_text(&mut ops, &count.to_string(), x, y - Mm(3.5), BuiltinFont::Helvetica, Pt(7.0), &black);
        }
        y = y - row_h;
    }

    // Totals row
    y = y - Mm(1.0);
    let totals_bg = Rgb { r: 0.85, g: 0.85, b: 0.9, icc_profile: None };
    pdf_rect_fill(&mut ops, table_left, y - row_h, table_right, y, &totals_bg);
    pdf_text(&mut ops, "TOTAL", Mm(22.0), y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(7.0), &black);
    for (i, t) in totals.iter().enumerate() {
        let x = Mm(50.0 + i as f32 * col_w);
        pdf_text(&mut ops, &t.to_string(), x, y - Mm(3.5), BuiltinFont::HelveticaBold, Pt(7.0), &black);
    }

    // Footer
    pdf_text(&mut ops, "adLoop — Ad Carousel Engine", Mm(20.0), Mm(10.0), BuiltinFont::Helvetica, Pt(7.0), &gray);

    doc.pages.push(PdfPage::new(Mm(210.0), Mm(297.0), ops));

    let mut warnings = Vec::new();
    doc.save(&PdfSaveOptions::default(), &mut warnings)
}

fn ctr_percent(impressions: usize, clicks: usize) -> f64 {
    if impressions == 0 {
        return 0.0;
    }
    clicks as f64 / impressions as f64 * 100.0
}

// --- PDF helper functions ---

fn rgb_black() -> Rgb { Rgb { r: 0.0, g: 0.0, b: 0.0, icc_profile: None } }
fn rgb_white() -> Rgb { Rgb { r: 1.0, g: 1.0, b: 1.0, icc_profile: None } }
fn rgb_header_bg() -> Rgb { Rgb { r: 0.2, g: 0.2, b: 0.3, icc_profile: None } }
fn rgb_alt_row() -> Rgb { Rgb { r: 0.95, g: 0.95, b: 0.95, icc_profile: None } }
fn rgb_gray() -> Rgb { Rgb { r: 0.5, g: 0.5, b: 0.5, icc_profile: None } }

fn pdf_text(ops: &mut Vec<Op>, text: &str, x: Mm, y: Mm, font: BuiltinFont, size: Pt, color: &Rgb) {
    ops.push(Op::StartTextSection);
    ops.push(Op::SetTextCursor { pos: Point::new(x, y) });
    ops.push(Op::SetFont { font: PdfFontHandle::Builtin(font), size });
    ops.push(Op::SetFillColor { col: Color::Rgb(color.clone()) });
    ops.push(Op::ShowText { items: vec![TextItem::Text(text.to_string())] });
    ops.push(Op::EndTextSection);
}

fn pdf_rect_fill(ops: &mut Vec<Op>, x1: Mm, y1: Mm, x2: Mm, y2: Mm, color: &Rgb) {
    ops.push(Op::SetFillColor { col: Color::Rgb(color.clone()) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    LinePoint { p: Point::new(x1, y1), bezier: false },
                    LinePoint { p: Point::new(x2, y1), bezier: false },
                    LinePoint { p: Point::new(x2, y2), bezier: false },
                    LinePoint { p: Point::new(x1, y2), bezier: false },
                ],
            }],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        },
    });
}

fn pdf_rect_stroke(ops: &mut Vec<Op>, x1: Mm, y1: Mm, x2: Mm, y2: Mm, color: &Rgb) {
    ops.push(Op::SetOutlineColor { col: Color::Rgb(color.clone()) });
    ops.push(Op::SetOutlineThickness { pt: Pt(0.5) });
    ops.push(Op::DrawPolygon {
        polygon: Polygon {
            rings: vec![PolygonRing {
                points: vec![
                    LinePoint { p: Point::new(x1, y1), bezier: false },
                    LinePoint { p: Point::new(x2, y1), bezier: false },
                    LinePoint { p: Point::new(x2, y2), bezier: false },
                    LinePoint { p: Point::new(x1, y2), bezier: false },
                ],
            }],
            mode: PaintMode::Stroke,
            winding_order: WindingOrder::NonZero,
        },
    });
}

/// Sanitize a string for use as a filename.
fn sanitize_filename(name: &str) -> String {
    name.chars()
        .map(|c| if c.is_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
        .collect()
}
