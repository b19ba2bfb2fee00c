use std::fmt;
use std::str::FromStr;

use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};
use image::RgbImage;
use ndarray::{Array2, Axis, concatenate};
use plotters::style::RGBColor;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use super::draw::{draw_data, draw_decision_regions, draw_prototypes, draw_topology, topology_edges};
use super::grid::{DataFormat, make_grid};
use super::palette::{LabelColors, NEUTRAL};
use super::surface::RenderSurface;
use super::telemetry::{EmbeddingRecord, TelemetryForwarder};
use crate::config::VisualizationConfig;
use crate::dataset::TrainingSamples;
use crate::error::{VizError, VizResult};
use crate::mesh::{MeshGrid, mesh2d, plot_bounds};
use crate::model::{
    ModelSnapshot, PrototypeModel, array2_to_tensor, int_tensor_to_vec, tensor2_to_array,
    tensor4_to_array,
};

const AXIS_LABELS: (&str, &str) = ("Data dimension 1", "Data dimension 2");

/// How prototypes relate to the data, and therefore how a cycle is drawn.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Variant {
    /// Prototypes live in input space; decision regions from `predict`.
    #[default]
    DirectSpace,
    /// Data and prototypes are compared after a learned mapping.
    RepresentationMapped,
    /// Components drawn without class colouring over `predict` regions.
    ComponentBoundary,
    /// Prototypes joined by the model's adjacency, no regions.
    TopologyGraph,
    /// Components are images, tiled into a grid.
    ImageGrid,
}

impl Variant {
    pub const ALL: [Variant; 5] = [
        Variant::DirectSpace,
        Variant::RepresentationMapped,
        Variant::ComponentBoundary,
        Variant::TopologyGraph,
        Variant::ImageGrid,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Variant::DirectSpace => "direct_space",
            Variant::RepresentationMapped => "representation_mapped",
            Variant::ComponentBoundary => "component_boundary",
            Variant::TopologyGraph => "topology_graph",
            Variant::ImageGrid => "image_grid",
        }
    }
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Variant {
    type Err = VizError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let normalized = value.trim().to_ascii_lowercase().replace('-', "_");
        Variant::ALL
            .into_iter()
            .find(|variant| variant.as_str() == normalized)
            .ok_or_else(|| {
                VizError::InvalidConfig(format!(
                    "unknown variant {value:?}; expected one of {}",
                    Variant::ALL.map(Variant::as_str).join(", ")
                ))
            })
    }
}

pub struct RenderContext<'a> {
    pub surface: &'a mut RenderSurface,
    pub config: &'a VisualizationConfig,
    pub samples: &'a TrainingSamples,
    pub epoch: usize,
}

#[derive(Debug, Default)]
pub struct RenderArtifacts {
    /// Component grid to forward under the "Components" tag.
    pub components: Option<RgbImage>,
}

pub trait RenderStrategy<B: Backend> {
    fn variant(&self) -> Variant;

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts>;

    /// One-off telemetry before the first epoch.
    fn on_train_start(
        &self,
        _samples: &TrainingSamples,
        _config: &VisualizationConfig,
        _telemetry: &mut TelemetryForwarder,
        _rng: &mut StdRng,
    ) -> VizResult<()> {
        Ok(())
    }
}

pub fn strategy_for<B: Backend>(
    variant: Variant,
    config: &VisualizationConfig,
) -> Box<dyn RenderStrategy<B>> {
    match variant {
        Variant::DirectSpace => Box::new(DirectSpace),
        Variant::RepresentationMapped => Box::new(RepresentationMapped {
            map_protos: config.map_protos,
        }),
        Variant::ComponentBoundary => Box::new(ComponentBoundary),
        Variant::TopologyGraph => Box::new(TopologyGraph),
        Variant::ImageGrid => Box::new(ImageGrid {
            columns: config.image_grid.num_columns,
            padding: config.image_grid.padding,
            format: config.image_grid.data_format,
        }),
    }
}

enum ProtoColors {
    ByLabel(Vec<i64>),
    Uniform(RGBColor),
}

impl ProtoColors {
    fn from_labels(labels: Option<Vec<i64>>) -> Self {
        labels.map_or(ProtoColors::Uniform(NEUTRAL), ProtoColors::ByLabel)
    }
}

struct Scene {
    data: Array2<f64>,
    data_labels: Vec<i64>,
    prototypes: Option<(Array2<f64>, ProtoColors)>,
    regions: Option<(MeshGrid, Array2<i64>)>,
    edges: Vec<(usize, usize)>,
    axis_labels: bool,
}

fn require_plane(points: &Array2<f64>, what: &str) -> VizResult<()> {
    if points.ncols() != 2 {
        return Err(VizError::Shape(format!(
            "{what} must be 2-D to draw decision regions, got {} column(s)",
            points.ncols()
        )));
    }
    Ok(())
}

fn mesh_cloud(data: &Array2<f64>, prototypes: Option<&Array2<f64>>) -> VizResult<Array2<f64>> {
    match prototypes {
        Some(protos) => concatenate(Axis(0), &[data.view(), protos.view()])
            .map_err(|err| VizError::Shape(err.to_string())),
        None => Ok(data.clone()),
    }
}

fn predict_regions<B, F>(mesh: &MeshGrid, device: &B::Device, predict: F) -> VizResult<Array2<i64>>
where
    B: Backend,
    F: FnOnce(Tensor<B, 2>) -> Tensor<B, 1, Int>,
{
    let query = array2_to_tensor::<B>(mesh.query.view(), device);
    let predictions = int_tensor_to_vec(predict(query))?;
    mesh.reshape_predictions(predictions)
}

fn draw_scene(ctx: &mut RenderContext<'_>, scene: Scene) -> VizResult<()> {
    let mut labels = scene.data_labels.clone();
    if let Some((_, ProtoColors::ByLabel(proto_labels))) = &scene.prototypes {
        labels.extend(proto_labels.iter().copied());
    }
    if let Some((_, predictions)) = &scene.regions {
        labels.extend(predictions.iter().copied());
    }
    let palette = LabelColors::new(ctx.config.colormap, labels);

    let (x_range, y_range) = match &scene.regions {
        Some((mesh, _)) => (mesh.x_range, mesh.y_range),
        None => {
            let cloud = mesh_cloud(&scene.data, scene.prototypes.as_ref().map(|(p, _)| p))?;
            plot_bounds(cloud.view(), ctx.config.border)?
        }
    };

    let data_colors: Vec<RGBColor> = scene
        .data_labels
        .iter()
        .map(|label| palette.color(*label))
        .collect();
    let proto_colors: Vec<RGBColor> = match &scene.prototypes {
        Some((protos, ProtoColors::ByLabel(proto_labels))) => proto_labels
            .iter()
            .take(protos.nrows())
            .map(|label| palette.color(*label))
            .collect(),
        Some((protos, ProtoColors::Uniform(color))) => vec![*color; protos.nrows()],
        None => Vec::new(),
    };

    ctx.surface.setup_axes(
        &ctx.config.title,
        scene.axis_labels.then_some(AXIS_LABELS),
        ctx.config.axis_off,
    );
    ctx.surface.plot(x_range, y_range, |chart| {
        if let Some((mesh, predictions)) = &scene.regions {
            draw_decision_regions(chart, mesh, predictions, &palette)?;
        }
        draw_data(chart, scene.data.view(), &data_colors)?;
        if let Some((protos, _)) = &scene.prototypes {
            if !scene.edges.is_empty() {
                draw_topology(chart, protos.view(), &scene.edges)?;
            }
            draw_prototypes(chart, protos.view(), &proto_colors)?;
        }
        Ok(())
    })
}

/// Prototypes in input space, regions from the model's classifier.
#[derive(Debug, Clone, Copy, Default)]
pub struct DirectSpace;

impl<B: Backend> RenderStrategy<B> for DirectSpace {
    fn variant(&self) -> Variant {
        Variant::DirectSpace
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts> {
        let scene = self.compose(ctx.config, ctx.samples, model)?;
        draw_scene(ctx, scene)?;
        Ok(RenderArtifacts::default())
    }
}

impl DirectSpace {
    fn compose<B: Backend>(
        &self,
        config: &VisualizationConfig,
        samples: &TrainingSamples,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<Scene> {
        let snapshot = ModelSnapshot::capture(model)?;
        require_plane(&snapshot.prototypes, "prototypes")?;
        let data = samples.points2d()?;
        let cloud = mesh_cloud(
            &data,
            config.show_protos.then_some(&snapshot.prototypes),
        )?;
        let mesh = mesh2d(cloud.view(), config.border, config.resolution, config.max_grid_points)?;
        let device = model.prototypes().device();
        let predictions = predict_regions::<B, _>(&mesh, &device, |query| model.predict(query))?;

        let ModelSnapshot { prototypes, labels } = snapshot;
        Ok(Scene {
            data,
            data_labels: samples.labels().to_vec(),
            prototypes: config
                .show_protos
                .then(|| (prototypes, ProtoColors::from_labels(labels))),
            regions: Some((mesh, predictions)),
            edges: Vec::new(),
            axis_labels: true,
        })
    }
}

/// Data and (optionally) prototypes are drawn after the model's learned
/// mapping; regions come from classifying mesh points in that space.
#[derive(Debug, Clone, Copy, Default)]
pub struct RepresentationMapped {
    pub map_protos: bool,
}

impl<B: Backend> RenderStrategy<B> for RepresentationMapped {
    fn variant(&self) -> Variant {
        Variant::RepresentationMapped
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts> {
        let scene = self.compose(ctx.config, ctx.samples, model)?;
        draw_scene(ctx, scene)?;
        Ok(RenderArtifacts::default())
    }
}

impl RepresentationMapped {
    fn compose<B: Backend>(
        &self,
        config: &VisualizationConfig,
        samples: &TrainingSamples,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<Scene> {
        let prototypes = model.prototypes();
        let device = prototypes.device();
        let labels = model.prototype_labels().map(int_tensor_to_vec).transpose()?;

        let inputs = samples.flattened()?.mapv(f64::from);
        let inputs = array2_to_tensor::<B>(inputs.view(), &device);
        let mapped = model.map_representation(inputs).ok_or_else(|| {
            VizError::Shape("model exposes no representation mapping".into())
        })?;
        let data = tensor2_to_array(mapped)?;
        require_plane(&data, "mapped data")?;

        let protos = if self.map_protos {
            let mapped = model.map_representation(prototypes).ok_or_else(|| {
                VizError::Shape("model exposes no representation mapping".into())
            })?;
            tensor2_to_array(mapped)?
        } else {
            tensor2_to_array(prototypes)?
        };
        if config.show_protos {
            require_plane(&protos, "prototypes")?;
        }

        let cloud = mesh_cloud(&data, config.show_protos.then_some(&protos))?;
        let mesh = mesh2d(cloud.view(), config.border, config.resolution, config.max_grid_points)?;
        let map_protos = self.map_protos;
        let predictions = predict_regions::<B, _>(&mesh, &device, |query| {
            model.predict_latent(query, map_protos)
        })?;

        Ok(Scene {
            data,
            data_labels: samples.labels().to_vec(),
            prototypes: config
                .show_protos
                .then(|| (protos, ProtoColors::from_labels(labels))),
            regions: Some((mesh, predictions)),
            edges: Vec::new(),
            axis_labels: false,
        })
    }
}

/// Unlabelled components drawn over the classifier's regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct ComponentBoundary;

impl<B: Backend> RenderStrategy<B> for ComponentBoundary {
    fn variant(&self) -> Variant {
        Variant::ComponentBoundary
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts> {
        let scene = self.compose(ctx.config, ctx.samples, model)?;
        draw_scene(ctx, scene)?;
        Ok(RenderArtifacts::default())
    }
}

impl ComponentBoundary {
    fn compose<B: Backend>(
        &self,
        config: &VisualizationConfig,
        samples: &TrainingSamples,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<Scene> {
        let prototypes = model.prototypes();
        let device = prototypes.device();
        let components = tensor2_to_array(prototypes)?;
        require_plane(&components, "components")?;
        let data = samples.points2d()?;

        let cloud = mesh_cloud(&data, config.show_protos.then_some(&components))?;
        let mesh = mesh2d(cloud.view(), config.border, config.resolution, config.max_grid_points)?;
        let predictions = predict_regions::<B, _>(&mesh, &device, |query| model.predict(query))?;

        Ok(Scene {
            data,
            data_labels: samples.labels().to_vec(),
            prototypes: config
                .show_protos
                .then(|| (components, ProtoColors::Uniform(NEUTRAL))),
            regions: Some((mesh, predictions)),
            edges: Vec::new(),
            axis_labels: true,
        })
    }
}

/// Prototypes joined by the model's topology; no regions.
#[derive(Debug, Clone, Copy, Default)]
pub struct TopologyGraph;

impl<B: Backend> RenderStrategy<B> for TopologyGraph {
    fn variant(&self) -> Variant {
        Variant::TopologyGraph
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts> {
        let scene = self.compose(ctx.samples, model)?;
        draw_scene(ctx, scene)?;
        Ok(RenderArtifacts::default())
    }
}

impl TopologyGraph {
    fn compose<B: Backend>(
        &self,
        samples: &TrainingSamples,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<Scene> {
        let protos = tensor2_to_array(model.prototypes())?;
        let adjacency = model
            .topology()
            .ok_or_else(|| VizError::Shape("model exposes no prototype topology".into()))?;
        let adjacency = tensor2_to_array(adjacency)?;
        let n = protos.nrows();
        if adjacency.dim() != (n, n) {
            return Err(VizError::Shape(format!(
                "topology must be {n}x{n} for {n} prototypes, got {}x{}",
                adjacency.nrows(),
                adjacency.ncols()
            )));
        }
        let edges = topology_edges(adjacency.view());
        let data = samples.points2d()?;
        let protos = if protos.ncols() > 2 {
            protos.slice(ndarray::s![.., 0..2]).to_owned()
        } else {
            protos
        };
        if protos.ncols() < 2 {
            return Err(VizError::Shape(format!(
                "prototypes need 2 coordinates to plot, got {}",
                protos.ncols()
            )));
        }

        Ok(Scene {
            data,
            data_labels: samples.labels().to_vec(),
            prototypes: Some((protos, ProtoColors::Uniform(NEUTRAL))),
            regions: None,
            edges,
            axis_labels: true,
        })
    }
}

/// Image components tiled into a grid and shown in place of the plot.
#[derive(Debug, Clone, Copy)]
pub struct ImageGrid {
    pub columns: usize,
    pub padding: usize,
    pub format: DataFormat,
}

impl Default for ImageGrid {
    fn default() -> Self {
        Self {
            columns: 2,
            padding: 2,
            format: DataFormat::Chw,
        }
    }
}

impl<B: Backend> RenderStrategy<B> for ImageGrid {
    fn variant(&self) -> Variant {
        Variant::ImageGrid
    }

    fn render(
        &self,
        ctx: &mut RenderContext<'_>,
        model: &dyn PrototypeModel<B>,
    ) -> VizResult<RenderArtifacts> {
        let components = model
            .components()
            .ok_or_else(|| VizError::Shape("model exposes no image components".into()))?;
        let components = tensor4_to_array(components)?;
        let grid = make_grid(components.view(), self.format, self.columns, self.padding)?;

        ctx.surface.setup_axes(&ctx.config.title, None, true);
        ctx.surface.blit_image(&grid);
        Ok(RenderArtifacts {
            components: Some(grid),
        })
    }

    fn on_train_start(
        &self,
        samples: &TrainingSamples,
        config: &VisualizationConfig,
        telemetry: &mut TelemetryForwarder,
        rng: &mut StdRng,
    ) -> VizResult<()> {
        if !telemetry.is_enabled() {
            return Ok(());
        }
        let grid_config = &config.image_grid;

        let data_grid = if grid_config.random_data > 0 {
            let subset = samples.random_subset(grid_config.random_data, rng);
            let images = subset.images()?;
            Some(make_grid(images.view(), self.format, self.columns, self.padding)?)
        } else {
            None
        };

        let embedding = if grid_config.add_embedding {
            let subset = samples.random_subset(grid_config.embedding_data, rng);
            let sprite_columns = ((subset.len() as f64).sqrt().ceil() as usize).max(1);
            let sprite = subset
                .images()
                .and_then(|images| make_grid(images.view(), self.format, sprite_columns, 0))
                .ok();
            Some(EmbeddingRecord {
                features: subset.flattened()?,
                metadata: subset.labels().to_vec(),
                sprite,
                step: None,
            })
        } else {
            None
        };

        telemetry.forward_startup(data_grid.as_ref(), embedding.as_ref());
        Ok(())
    }
}
