use super::{window_field, FieldReader, ModelRequest, ObsRequest, ReaderError, TotalAnomaly};
use crate::case::Member;
use crate::field::Field;
use crate::time_utils::to_lead_axis;
use std::collections::HashMap;

type ObsKey = (String, String, TotalAnomaly);
type ModelKey = (String, String, Member, TotalAnomaly);

/// Fields held in memory, keyed like the on-disk archive.
///
/// Observation fields keep absolute day numbers on axis 0 and are returned
/// as leads from the request's initialisation day. Model fields already carry leads.
/// Stored anomalies are returned as they are, whatever climatology years
/// are requested.
#[derive(Debug, Default, Clone)]
pub struct MemoryArchive {
    observations: HashMap<ObsKey, Field>,
    models: HashMap<ModelKey, Field>,
}

impl MemoryArchive {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_observation(&mut self, source: &str, variable: &str, kind: TotalAnomaly, field: Field) {
        self.observations
            .insert((source.to_string(), variable.to_string(), kind), field);
    }

    pub fn insert_model(&mut self, model: &str, variable: &str, member: Member, kind: TotalAnomaly, field: Field) {
        self.models
            .insert((model.to_string(), variable.to_string(), member, kind), field);
    }
}

impl FieldReader for MemoryArchive {
    fn read_observation(&self, request: &ObsRequest<'_>) -> Result<Option<Field>, ReaderError> {
        let key = (request.source.to_string(), request.variable.to_string(), request.kind);
        let Some(field) = self.observations.get(&key) else {
            return Ok(None);
        };
        Ok(window_field(field, request.min_maxs).map(|mut f| {
            f.dims[0] = to_lead_axis(&f.dims[0], request.init_day);
            f
        }))
    }

    fn read_model(&self, request: &ModelRequest<'_>) -> Result<Option<Field>, ReaderError> {
        let key = (
            request.model.name.clone(),
            request.variable.to_string(),
            request.member,
            request.kind,
        );
        Ok(self
            .models
            .get(&key)
            .and_then(|field| window_field(field, request.min_maxs)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::case::Model;
    use chrono::NaiveDate;
    use ndarray::{ArrayD, IxDyn};

    fn series(t0: f64, n: usize) -> Field {
        let values = ArrayD::from_shape_fn(IxDyn(&[n, 2]), |ix| ix[0] as f64);
        Field::new(values, vec![(0..n).map(|i| t0 + i as f64).collect(), vec![0.0, 1.0]]).unwrap()
    }

    #[test]
    fn test_observation_time_becomes_lead() {
        let mut archive = MemoryArchive::new();
        archive.insert_observation("era5", "olr", TotalAnomaly::Anomaly, series(1000.0, 10));

        let min_maxs = [[1003.0, 1006.0], [0.0, 1.0]];
        let request = ObsRequest {
            variable: "olr",
            kind: TotalAnomaly::Anomaly,
            min_maxs: &min_maxs,
            init_day: 1000.0,
            source: "era5",
            clim_years: [2001, 2020],
        };
        let field = archive.read_observation(&request).unwrap().unwrap();
        assert_eq!(field.dims[0], vec![3.0, 4.0, 5.0, 6.0]);
        assert_eq!(field.values[[0, 0]], 3.0);

        let total = ObsRequest { kind: TotalAnomaly::Total, ..request };
        assert!(archive.read_observation(&total).unwrap().is_none());
    }

    #[test]
    fn test_model_lookup_by_member() {
        let model = Model::new(
            "exp",
            NaiveDate::from_ymd_opt(2009, 1, 26).unwrap(),
            1,
            vec![Member::Control, Member::Member(1)],
            10,
            None,
            false,
        )
        .unwrap();
        let mut archive = MemoryArchive::new();
        archive.insert_model("exp", "u", Member::Member(1), TotalAnomaly::Total, series(0.0, 10));

        let min_maxs = [[0.0, 4.0], [0.0, 1.0]];
        let mut request = ModelRequest {
            model: &model,
            member: Member::Member(1),
            variable: "u",
            kind: TotalAnomaly::Total,
            min_maxs: &min_maxs,
            clim_years: None,
        };
        assert_eq!(archive.read_model(&request).unwrap().unwrap().values.shape(), &[5, 2]);

        request.member = Member::Control;
        assert!(archive.read_model(&request).unwrap().is_none());
    }
}
