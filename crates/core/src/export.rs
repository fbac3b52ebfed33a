//! Conversion of a finalized design into the serializable resolved model.
//!
//! Services and endpoints are sorted by name, responses by status and errors
//! by name; the type table lists every named type the transport mapping
//! reaches, sorted by name then uid.

use std::collections::BTreeSet;

use httpdesign_common::{
    ApiModel, EndpointModel, ErrorModel, FieldModel, MODEL_VERSION, ParamModel, ResolvedModel,
    ResponseModel, RouteModel, SchemeModel, ServiceModel, TagModel, TypeModel, TypeRef,
};

use crate::expr::{
    Attribute, DataType, Endpoint, HttpError, HttpService, MappedAttribute, ResolvedScheme,
    Response, Root, TypeId, TypeRegistry,
};
use crate::http::route;

/// Build the resolved model of a finalized and validated design.
pub fn export(root: &Root) -> ResolvedModel {
    let mut exporter = Exporter {
        types: &root.types,
        reached: BTreeSet::new(),
    };

    let mut services: Vec<&HttpService> = root.http.services.iter().collect();
    services.sort_by(|a, b| a.name.cmp(&b.name));
    let services = services.into_iter().map(|s| exporter.service(s)).collect();

    ResolvedModel {
        version: MODEL_VERSION,
        api: ApiModel {
            name: root.api.name.clone(),
            title: root.api.title.clone(),
            version: root.api.version.clone(),
            base_path: route::clean(&root.http.path),
        },
        services,
        types: exporter.type_table(),
    }
}

struct Exporter<'a> {
    types: &'a TypeRegistry,
    reached: BTreeSet<TypeId>,
}

impl Exporter<'_> {
    fn service(&mut self, service: &HttpService) -> ServiceModel {
        let mut endpoints: Vec<&Endpoint> = service.endpoints.iter().collect();
        endpoints.sort_by(|a, b| a.name.cmp(&b.name));
        ServiceModel {
            name: service.name.clone(),
            paths: service.full_paths.clone(),
            parent: service.parent.clone(),
            canonical_endpoint: service.canonical().map(|e| e.name.clone()),
            params: self.params(&service.params),
            headers: self.params(&service.headers),
            endpoints: endpoints.into_iter().map(|e| self.endpoint(e)).collect(),
        }
    }

    fn endpoint(&mut self, endpoint: &Endpoint) -> EndpointModel {
        let mut responses: Vec<&Response> = endpoint.responses.iter().collect();
        responses.sort_by_key(|r| r.status);
        let mut errors: Vec<&HttpError> = endpoint.errors.iter().collect();
        errors.sort_by(|a, b| a.name.cmp(&b.name));
        EndpointModel {
            name: endpoint.name.clone(),
            routes: endpoint
                .routes
                .iter()
                .map(|r| RouteModel {
                    verb: r.verb.as_str().to_string(),
                    path: r.path.clone(),
                    full_paths: r.full_paths.clone(),
                })
                .collect(),
            path_params: self.params(&endpoint.path_params),
            query_params: self.params(&endpoint.query_params),
            headers: self.params(&endpoint.headers),
            body: self.body(endpoint.body.as_ref()),
            map_query_params: endpoint.map_query_params.clone(),
            multipart_request: endpoint.multipart_request,
            responses: responses.into_iter().map(|r| self.response(r)).collect(),
            errors: errors
                .into_iter()
                .map(|e| ErrorModel {
                    name: e.name.clone(),
                    response: self.response(&e.response),
                })
                .collect(),
            security: endpoint.security.iter().map(scheme).collect(),
        }
    }

    fn response(&mut self, response: &Response) -> ResponseModel {
        ResponseModel {
            status: response.status,
            tag: response.tag.as_ref().map(|t| TagModel {
                name: t.name.clone(),
                value: t.value.clone(),
            }),
            headers: self.params(&response.headers),
            body: self.body(response.body.as_ref()),
            content_type: response.content_type.clone(),
        }
    }

    fn params(&mut self, mapped: &MappedAttribute) -> Vec<ParamModel> {
        mapped
            .iter()
            .map(|(name, att)| ParamModel {
                name: name.clone(),
                wire_name: mapped.wire_name(name).to_string(),
                ty: self.type_ref(att),
                required: mapped.is_required(name),
                description: att.description.clone(),
                default: att.default.clone(),
            })
            .collect()
    }

    fn body(&mut self, body: Option<&Attribute>) -> Option<TypeRef> {
        body.filter(|b| !self.types.is_empty_attribute(b))
            .map(|b| self.type_ref(b))
    }

    fn type_ref(&mut self, attr: &Attribute) -> TypeRef {
        let types = self.types;
        types.walk(&attr.ty, |id| {
            self.reached.insert(id);
        });
        to_type_ref(types, attr)
    }

    fn type_table(&self) -> Vec<TypeModel> {
        let mut table: Vec<TypeModel> = self
            .reached
            .iter()
            .filter_map(|id| self.types.get(*id))
            .map(|ut| TypeModel {
                name: ut.name.clone(),
                uid: ut.uid.clone(),
                ty: to_type_ref(self.types, &ut.attribute),
                description: ut.attribute.description.clone(),
                identifier: ut.result.as_ref().map(|r| r.identifier.clone()),
                views: ut
                    .result
                    .as_ref()
                    .map(|r| r.views.iter().map(|v| v.name.clone()).collect())
                    .unwrap_or_default(),
            })
            .collect();
        table.sort_by(|a, b| (&a.name, &a.uid).cmp(&(&b.name, &b.uid)));
        table.dedup_by(|a, b| a.name == b.name && a.uid == b.uid);
        table
    }
}

/// Type reference of an attribute. Named types are referenced, everything
/// else is described inline.
fn to_type_ref(types: &TypeRegistry, attr: &Attribute) -> TypeRef {
    match &attr.ty {
        DataType::User(id) => match types.get(*id) {
            Some(ut) => TypeRef::Named {
                name: ut.name.clone(),
                uid: ut.uid.clone(),
            },
            None => primitive("Any"),
        },
        DataType::Object(fields) => TypeRef::Object {
            fields: fields
                .iter()
                .map(|(name, att)| FieldModel {
                    name: name.clone(),
                    ty: to_type_ref(types, att),
                    required: attr.required().contains(name),
                })
                .collect(),
        },
        DataType::Array(elem) => TypeRef::Array {
            elem: Box::new(to_type_ref(types, elem)),
        },
        DataType::Map { key, elem } => TypeRef::Map {
            key: Box::new(to_type_ref(types, key)),
            elem: Box::new(to_type_ref(types, elem)),
        },
        DataType::Primitive(p) => primitive(p.name()),
        DataType::Empty => primitive("Empty"),
    }
}

fn primitive(name: &str) -> TypeRef {
    TypeRef::Primitive {
        name: name.to_string(),
    }
}

fn scheme(s: &ResolvedScheme) -> SchemeModel {
    SchemeModel {
        scheme: s.scheme.clone(),
        kind: s.kind.name().to_string(),
        attribute: s.attribute.clone(),
        attributes: s.attributes.clone(),
        location: s.location.map(|l| l.as_str().to_string()),
        wire_name: s.wire_name.clone(),
    }
}
