use fbxcel_dom::v7400::object::model::TypedModelHandle;
use fbxcel_dom::v7400::object::TypedObjectHandle;
use fbxcel_dom::v7400::Document;

pub fn get_models(doc: &Document) -> impl Iterator<Item = TypedModelHandle<'_>> {
    doc.objects().filter_map(|o| {
        if let TypedObjectHandle::Model(model) = o.get_typed() {
            return Some(model);
        }
        None
    })
}

/// The model this model is parented under, if any. Unlabelled connections are parent links.
pub fn parent_model<'a>(model: &TypedModelHandle<'a>) -> Option<TypedModelHandle<'a>> {
    model
        .destination_objects()
        .filter(|obj| obj.label().is_none())
        .filter_map(|obj| obj.object_handle())
        .filter_map(|obj| match obj.get_typed() {
            TypedObjectHandle::Model(o) => Some(o),
            _ => None,
        })
        .next()
}

pub fn model_name<'a>(model: &TypedModelHandle<'a>) -> &'a str {
    model.name().unwrap_or("(no name)")
}
