//! Plot artists: things that collect samples and draw themselves on a canvas.

use std::collections::BTreeMap;

use tracing::debug;

use crate::data::{Sample, histogram};
use crate::domain::{BinnedSample, FitConfig, FitResult};
use crate::error::FitError;
use crate::fit::fit;
use crate::plot::{Canvas, Marks, spectrum_canvas};

/// Anything that renders a collection of samples.
pub trait Artist {
    /// Accumulate one more sample.
    fn add_sample(&mut self, sample: &Sample) -> Result<(), FitError>;

    /// Draw onto an existing canvas.
    fn draw(&self, canvas: &mut Canvas);
}

/// A one-dimensional spectrum stacked over display categories.
///
/// `categories` maps the category id carried by each event to the label it
/// is aggregated under; several ids may share one label. Events with an
/// unmapped category are ignored.
#[derive(Debug, Clone)]
pub struct Spectrum {
    title: Option<String>,
    edges: Vec<f64>,
    categories: BTreeMap<u32, String>,
    counts: BTreeMap<String, Vec<f64>>,
    ordinate: Option<String>,
    exposure: Option<f64>,
    fit: Option<FitResult>,
    pot_vertical: bool,
    error_boxes: bool,
    preliminary: Option<String>,
}

impl Spectrum {
    pub fn new(edges: Vec<f64>, categories: BTreeMap<u32, String>) -> Result<Self, FitError> {
        // Validates the edges up front.
        let zeros = histogram(std::iter::empty::<f64>(), &edges)?;
        let counts = categories
            .values()
            .map(|label| (label.clone(), zeros.clone()))
            .collect();
        Ok(Self {
            title: None,
            edges,
            categories,
            counts,
            ordinate: None,
            exposure: None,
            fit: None,
            pot_vertical: false,
            error_boxes: false,
            preliminary: None,
        })
    }

    /// A spectrum holding one already-binned histogram under `label`.
    pub fn from_binned(label: &str, sample: &BinnedSample) -> Result<Self, FitError> {
        let mut spectrum = Self::new(sample.edges.clone(), BTreeMap::new())?;
        spectrum.add_binned(label, sample)?;
        Ok(spectrum)
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    /// Name of the sample whose exposure is shown. Without one, the first
    /// sample added sets the exposure.
    pub fn with_ordinate(mut self, name: impl Into<String>) -> Self {
        self.ordinate = Some(name.into());
        self
    }

    pub fn with_preliminary(mut self, label: impl Into<String>) -> Self {
        self.preliminary = Some(label.into());
        self
    }

    /// Draw the exposure mark vertically along the left edge.
    pub fn with_vertical_pot(mut self, vertical: bool) -> Self {
        self.pot_vertical = vertical;
        self
    }

    /// Outline each bin with a `±sqrt(count)` box half a bin wide.
    pub fn with_error_boxes(mut self, enabled: bool) -> Self {
        self.error_boxes = enabled;
        self
    }

    /// Set the exposure directly; only a later ordinate sample replaces it.
    pub fn with_exposure(mut self, exposure: f64) -> Self {
        self.exposure = Some(exposure);
        self
    }

    /// Attach a fit computed elsewhere for the overlay.
    pub fn with_fit(mut self, fit: FitResult) -> Self {
        self.fit = Some(fit);
        self
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    pub fn exposure(&self) -> Option<f64> {
        self.exposure
    }

    pub fn fit_result(&self) -> Option<&FitResult> {
        self.fit.as_ref()
    }

    /// Per-bin counts accumulated under a display label.
    pub fn category_counts(&self, label: &str) -> Option<&[f64]> {
        self.counts.get(label).map(Vec::as_slice)
    }

    /// Stacked total over all display labels.
    pub fn binned(&self) -> BinnedSample {
        let mut total = vec![0.0; self.edges.len() - 1];
        for counts in self.counts.values() {
            for (t, c) in total.iter_mut().zip(counts) {
                *t += c;
            }
        }
        BinnedSample::from_edges(self.edges.clone(), total)
    }

    /// Add binned counts under a display label. Edges must match exactly.
    pub fn add_binned(&mut self, label: &str, sample: &BinnedSample) -> Result<(), FitError> {
        if sample.edges != self.edges || sample.counts.len() + 1 != self.edges.len() {
            return Err(FitError::InvalidInput(format!(
                "Histogram '{label}' does not share the spectrum's {} bins.",
                self.edges.len() - 1
            )));
        }
        let counts = self
            .counts
            .entry(label.to_string())
            .or_insert_with(|| vec![0.0; sample.counts.len()]);
        for (c, a) in counts.iter_mut().zip(&sample.counts) {
            *c += a;
        }
        Ok(())
    }

    /// Fit the stacked total and keep the result for the overlay.
    pub fn fit_with(&mut self, config: &FitConfig) -> Result<&FitResult, FitError> {
        let result = fit(&self.binned(), config)?;
        Ok(&*self.fit.insert(result))
    }

    /// Render on a fresh canvas sized to the data and overlay.
    pub fn render(&self, width: usize, height: usize) -> String {
        let mut extent = self.binned();
        if self.error_boxes {
            for c in &mut extent.counts {
                *c += c.max(0.0).sqrt();
            }
        }
        let mut canvas = spectrum_canvas(&extent, self.fit.as_ref().map(|f| &f.curve), width, height);
        self.draw(&mut canvas);

        let mut out = String::new();
        if let Some(title) = &self.title {
            out.push_str(title);
            out.push('\n');
        }
        out.push_str(&canvas.render());
        if let Some(fit) = &self.fit {
            out.push_str(&fit.label);
            out.push('\n');
        }
        out
    }
}

impl Artist for Spectrum {
    fn add_sample(&mut self, sample: &Sample) -> Result<(), FitError> {
        let is_ordinate = match &self.ordinate {
            Some(name) => *name == sample.name,
            None => self.exposure.is_none(),
        };
        if is_ordinate {
            self.exposure = Some(sample.exposure);
        }

        for (&id, label) in &self.categories {
            let add = histogram(sample.values_in(id), &self.edges)?;
            if let Some(counts) = self.counts.get_mut(label) {
                for (c, a) in counts.iter_mut().zip(add) {
                    *c += a;
                }
            }
        }
        debug!("added sample '{}' ({} events) to spectrum", sample.name, sample.len());
        Ok(())
    }

    fn draw(&self, canvas: &mut Canvas) {
        if let Some(fit) = &self.fit {
            canvas.curve(fit.curve.points());
        }
        let binned = self.binned();
        if self.error_boxes {
            let half_widths: Vec<f64> = binned.widths().iter().map(|w| w / 2.0).collect();
            let errors: Vec<f64> = binned.counts.iter().map(|c| c.max(0.0).sqrt()).collect();
            canvas.error_boxes(&binned.centers, &binned.counts, &half_widths, &errors);
        }
        // Bars only fill blank cells, so the curve and boxes stay visible.
        canvas.bars(&binned.edges, &binned.counts);
        canvas.marks(&Marks {
            pot: self.exposure,
            pot_vertical: self.pot_vertical,
            preliminary: self.preliminary.clone(),
        });
    }
}
