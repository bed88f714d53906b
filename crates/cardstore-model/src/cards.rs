//! Built-in card types.
//!
//! Registration order is the order type groups are written within a
//! collection. Columnar types are the high-cardinality cards whose fields are
//! all fixed width.

use crate::entity::Entity;
use crate::error::Result;
use crate::registry::TypeRegistry;
use crate::schema::kinds::*;
use crate::schema::CardSchema;
use crate::value::Value;

/// Build the registry of every built-in card.
pub fn registry() -> Result<TypeRegistry> {
    let mut registry = TypeRegistry::new();
    for schema in schemas() {
        registry.register(schema)?;
    }
    Ok(registry)
}

// ============================================================================
// Finalize hooks
// ============================================================================

/// Older writers stored "no reference" as -1.
fn clear_legacy_ref(entity: &mut Entity, field: &str) {
    if entity.int(field) == Some(-1) {
        entity.unset(field);
    }
}

fn clear_legacy_mcsid(entity: &mut Entity) {
    clear_legacy_ref(entity, "mcsid");
}

fn clear_legacy_region(entity: &mut Entity) {
    clear_legacy_ref(entity, "region");
}

/// Matrix input types 3 and 4 are complex.
fn derive_matrix_flags(entity: &mut Entity) {
    let complex = matches!(entity.int("tin"), Some(3 | 4));
    entity.set("is_complex", Value::bool(complex));
}

// ============================================================================
// Descriptor tables
// ============================================================================

fn cord1(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("cid", REF)
        .field("g1", REF)
        .field("g2", REF)
        .field("g3", REF)
}

fn cord2(tag: &str) -> CardSchema {
    CardSchema::columnar(tag)
        .field("cid", REF)
        .optional("rid", REF)
        .field("e1", floats(3))
        .field("e2", floats(3))
        .field("e3", floats(3))
}

fn shell(tag: &str, nodes: usize) -> CardSchema {
    let schema = CardSchema::columnar(tag)
        .field("eid", REF)
        .field("pid", REF)
        .field("nids", ints(nodes))
        .optional("theta", FLOAT)
        .optional("mcid", REF)
        .optional("zoffset", FLOAT)
        .optional("tflag", INT);
    (1..=nodes).fold(schema, |s, i| s.optional(&format!("t{i}"), FLOAT))
}

fn solid(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("eid", REF)
        .field("pid", REF)
        .field("nids", INTS)
}

fn point_load(tag: &str) -> CardSchema {
    CardSchema::columnar(tag)
        .field("sid", REF)
        .field("node", REF)
        .field("cid", REF)
        .field("mag", FLOAT)
        .field("xyz", floats(3))
}

fn combination(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("sid", REF)
        .field("scale", FLOAT)
        .field("scale_factors", FLOATS)
        .field("load_ids", INTS)
}

fn set1(tag: &str) -> CardSchema {
    CardSchema::generic(tag).field("components", STR).field("ids", INTS)
}

fn se_set1(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("seid", INT)
        .field("components", STR)
        .field("ids", INTS)
}

/// Per-degree-of-freedom scale tables (DAREA, DELAY, DPHASE).
fn dof_table(tag: &str, values: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("sid", REF)
        .field("nodes", INTS)
        .field("components", INTS)
        .field(values, FLOATS)
}

fn relation(tag: &str, target: &str, name: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("oid", REF)
        .field(&format!("{target}_type"), STR)
        .field(target, REF)
        .field(name, ANY)
        .optional(&format!("{name}_min"), FLOAT)
        .optional(&format!("{name}_max"), FLOAT)
        .field("c0", FLOAT)
        .field("desvar_ids", INTS)
        .field("coeffs", FLOATS)
}

fn orientation(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .optional("pid", REF)
        .optional("g0", REF)
        .optional("x", floats(3))
        .field("offt", STR)
}

fn dmig(tag: &str) -> CardSchema {
    CardSchema::generic(tag)
        .field("name", STR)
        .field("ifo", INT)
        .field("tin", INT)
        .field("tout", INT)
        .field("polar", INT)
        .field("ncols", INT)
        .field("gcj", INTS)
        .field("gci", INTS)
        .field("real", FLOATS)
        .optional("complex", FLOATS)
        .field("is_complex", BOOL)
        .skip("is_complex")
        .on_finalize(derive_matrix_flags)
}

fn schemas() -> Vec<CardSchema> {
    vec![
        // nodes
        CardSchema::columnar("GRID")
            .field("nid", REF)
            .optional("cp", REF)
            .field("xyz", floats(3))
            .optional("cd", REF)
            .optional("ps", STR)
            .optional("seid", INT),
        CardSchema::generic("SPOINT").field("nid", REF),
        CardSchema::generic("EPOINT").field("nid", REF),
        // coords
        cord1("CORD1R"),
        cord1("CORD1C"),
        cord1("CORD1S"),
        cord2("CORD2R"),
        cord2("CORD2C"),
        cord2("CORD2S"),
        // elements
        CardSchema::columnar("CONROD")
            .field("eid", REF)
            .field("nids", ints(2))
            .field("mid", REF)
            .field("a", FLOAT)
            .optional("j", FLOAT)
            .optional("c", FLOAT)
            .optional("nsm", FLOAT),
        CardSchema::columnar("CROD")
            .field("eid", REF)
            .field("pid", REF)
            .field("nids", ints(2)),
        CardSchema::columnar("CBAR")
            .field("eid", REF)
            .field("pid", REF)
            .field("nids", ints(2))
            .optional("x", floats(3))
            .optional("g0", REF)
            .optional("offt", STR)
            .optional("pa", INT)
            .optional("pb", INT)
            .optional("wa", floats(3))
            .optional("wb", floats(3)),
        CardSchema::generic("CBEAM")
            .field("eid", REF)
            .field("pid", REF)
            .field("nids", INTS)
            .optional("x", FLOATS)
            .optional("g0", REF)
            .optional("offt", STR)
            .optional("bit", FLOAT)
            .optional("pa", INT)
            .optional("pb", INT)
            .optional("wa", FLOATS)
            .optional("wb", FLOATS)
            .optional("sa", INT)
            .optional("sb", INT),
        shell("CQUAD4", 4),
        shell("CTRIA3", 3),
        CardSchema::columnar("CTETRA")
            .field("eid", REF)
            .field("pid", REF)
            .field("nids", ints(4)),
        solid("CPENTA"),
        solid("CHEXA"),
        CardSchema::generic("CELAS1")
            .field("eid", REF)
            .field("pid", REF)
            .field("nids", INTS)
            .optional("c1", INT)
            .optional("c2", INT),
        // masses
        CardSchema::columnar("CONM2")
            .field("eid", REF)
            .field("nid", REF)
            .field("cid", REF)
            .field("mass", FLOAT)
            .field("x", floats(3))
            .field("i", floats(6)),
        CardSchema::generic("CMASS2")
            .field("eid", REF)
            .field("mass", FLOAT)
            .field("nids", INTS)
            .optional("c1", INT)
            .optional("c2", INT),
        // rigid elements
        CardSchema::generic("RBE2")
            .field("eid", REF)
            .field("gn", REF)
            .field("cm", STR)
            .field("gmi", INTS)
            .optional("alpha", FLOAT),
        CardSchema::generic("RBE3")
            .field("eid", REF)
            .field("refgrid", REF)
            .field("refc", STR)
            .field("weights", FLOATS)
            .field("comps", STRS)
            .field("gij_counts", INTS)
            .field("gijs", INTS)
            .optional("gmi", INTS)
            .optional("cmi", STRS)
            .optional("alpha", FLOAT),
        // properties
        CardSchema::columnar("PSHELL")
            .field("pid", REF)
            .optional("mid1", REF)
            .optional("t", FLOAT)
            .optional("mid2", REF)
            .field("twelve_it3", FLOAT)
            .optional("mid3", REF)
            .field("tst", FLOAT)
            .field("nsm", FLOAT)
            .optional("z1", FLOAT)
            .optional("z2", FLOAT)
            .optional("mid4", REF),
        CardSchema::columnar("PSOLID")
            .field("pid", REF)
            .field("mid", REF)
            .field("cordm", INT)
            .optional("integ", STR)
            .optional("stress", STR)
            .optional("isop", STR)
            .field("fctn", STR),
        CardSchema::columnar("PROD")
            .field("pid", REF)
            .field("mid", REF)
            .field("a", FLOAT)
            .field("j", FLOAT)
            .field("c", FLOAT)
            .field("nsm", FLOAT),
        CardSchema::columnar("PBAR")
            .field("pid", REF)
            .field("mid", REF)
            .field("a", FLOAT)
            .field("i1", FLOAT)
            .field("i2", FLOAT)
            .field("i12", FLOAT)
            .field("j", FLOAT)
            .field("nsm", FLOAT)
            .field("stress_points", floats(8))
            .optional("k1", FLOAT)
            .optional("k2", FLOAT),
        CardSchema::generic("PCOMP")
            .field("pid", REF)
            .optional("z0", FLOAT)
            .field("nsm", FLOAT)
            .field("sb", FLOAT)
            .optional("ft", STR)
            .field("tref", FLOAT)
            .field("ge", FLOAT)
            .optional("lam", STR)
            .field("mids", INTS)
            .field("thicknesses", FLOATS)
            .field("thetas", FLOATS)
            .field("souts", STRS),
        CardSchema::generic("PELAS")
            .field("pid", REF)
            .field("k", FLOAT)
            .field("ge", FLOAT)
            .field("s", FLOAT),
        CardSchema::generic("PMASS").field("pid", REF).field("mass", FLOAT),
        // materials
        CardSchema::columnar("MAT1")
            .field("mid", REF)
            .optional("e", FLOAT)
            .optional("g", FLOAT)
            .optional("nu", FLOAT)
            .field("rho", FLOAT)
            .field("a", FLOAT)
            .field("tref", FLOAT)
            .field("ge", FLOAT)
            .field("st", FLOAT)
            .field("sc", FLOAT)
            .field("ss", FLOAT)
            .optional("mcsid", REF)
            .on_finalize(clear_legacy_mcsid),
        CardSchema::generic("MAT2")
            .field("mid", REF)
            .field("g", floats(6))
            .field("rho", FLOAT)
            .optional("a", FLOATS)
            .field("tref", FLOAT)
            .field("ge", FLOAT)
            .optional("st", FLOAT)
            .optional("sc", FLOAT)
            .optional("ss", FLOAT)
            .optional("mcsid", REF)
            .on_finalize(clear_legacy_mcsid),
        CardSchema::columnar("MAT8")
            .field("mid", REF)
            .field("e11", FLOAT)
            .field("e22", FLOAT)
            .field("nu12", FLOAT)
            .field("g12", FLOAT)
            .field("g1z", FLOAT)
            .field("g2z", FLOAT)
            .field("rho", FLOAT)
            .field("a1", FLOAT)
            .field("a2", FLOAT)
            .field("tref", FLOAT)
            .field("xt", FLOAT)
            .field("xc", FLOAT)
            .field("yt", FLOAT)
            .field("yc", FLOAT)
            .field("s", FLOAT)
            .field("ge", FLOAT)
            .field("f12", FLOAT)
            .field("strn", FLOAT),
        CardSchema::generic("MAT4")
            .field("mid", REF)
            .field("k", FLOAT)
            .field("cp", FLOAT)
            .field("rho", FLOAT)
            .optional("h", FLOAT)
            .optional("mu", FLOAT)
            .field("hgen", FLOAT)
            .optional("ref_enthalpy", FLOAT)
            .optional("tch", FLOAT)
            .optional("tdelta", FLOAT)
            .optional("qlat", FLOAT),
        CardSchema::generic("CREEP")
            .field("mid", REF)
            .field("t0", FLOAT)
            .field("exp", FLOAT)
            .field("form", STR)
            .optional("tidkp", REF)
            .optional("tidcp", REF)
            .optional("tidcs", REF)
            .field("thresh", FLOAT)
            .field("typ", INT)
            .field("coefficients", floats(7)),
        // constraints
        CardSchema::generic("SPC")
            .field("conid", REF)
            .field("nodes", INTS)
            .field("components", STRS)
            .field("enforced", FLOATS),
        CardSchema::generic("SPC1")
            .field("conid", REF)
            .field("components", STR)
            .field("nodes", INTS),
        CardSchema::generic("SPCADD").field("conid", REF).field("sets", INTS),
        CardSchema::generic("MPC")
            .field("conid", REF)
            .field("nodes", INTS)
            .field("components", STRS)
            .field("coefficients", FLOATS),
        CardSchema::generic("MPCADD").field("conid", REF).field("sets", INTS),
        // static loads
        point_load("FORCE"),
        point_load("MOMENT"),
        CardSchema::generic("PLOAD4")
            .field("sid", REF)
            .field("eids", INTS)
            .field("pressures", FLOATS)
            .optional("g1", REF)
            .optional("g34", REF)
            .optional("cid", REF)
            .optional("nvector", FLOATS)
            .field("surf_or_line", STR)
            .field("line_load_dir", STR),
        CardSchema::generic("TEMP")
            .field("sid", REF)
            .field("temperatures", FLOAT_MAP),
        combination("LOAD"),
        // dynamic loads
        combination("DLOAD"),
        CardSchema::generic("TLOAD1")
            .field("sid", REF)
            .field("excite_id", REF)
            .optional("delay", INT)
            .field("load_type", STR)
            .field("tid", REF)
            .field("us0", FLOAT)
            .field("vs0", FLOAT),
        CardSchema::generic("RLOAD1")
            .field("sid", REF)
            .field("excite_id", REF)
            .optional("delay", INT)
            .optional("dphase", INT)
            .optional("tc", INT)
            .optional("td", INT)
            .field("load_type", STR),
        CardSchema::generic("FREQ").field("sid", REF).field("freqs", FLOATS),
        CardSchema::generic("FREQ1")
            .field("sid", REF)
            .field("f1", FLOAT)
            .field("df", FLOAT)
            .field("ndf", INT),
        // mass and boundary conditions
        CardSchema::generic("NSM")
            .field("sid", REF)
            .field("nsm_type", STR)
            .field("ids", INTS)
            .field("values", FLOATS),
        CardSchema::generic("NSMADD").field("sid", REF).field("sets", INTS),
        CardSchema::generic("CONV")
            .field("eid", REF)
            .field("pconid", REF)
            .optional("film_node", REF)
            .optional("cntrlnd", REF)
            .field("ta", INTS),
        CardSchema::generic("TF")
            .field("sid", REF)
            .field("nid0", REF)
            .field("c", INT)
            .field("b", floats(3))
            .field("nids", INTS)
            .field("components", INTS)
            .field("a", FLOATS),
        dof_table("DAREA", "scales"),
        dof_table("DELAY", "delays"),
        dof_table("DPHASE", "phase_leads"),
        CardSchema::generic("TIC")
            .field("sid", REF)
            .field("nodes", INTS)
            .field("components", INTS)
            .field("u0", FLOATS)
            .field("v0", FLOATS),
        // methods and tables
        CardSchema::generic("EIGRL")
            .field("sid", REF)
            .optional("v1", FLOAT)
            .optional("v2", FLOAT)
            .optional("nd", INT)
            .field("msglvl", INT)
            .optional("maxset", INT)
            .optional("shfscl", FLOAT)
            .optional("norm", STR)
            .field("options", STRS)
            .field("values", ANYS),
        CardSchema::generic("TABLED1")
            .field("tid", REF)
            .field("xaxis", STR)
            .field("yaxis", STR)
            .field("x", FLOATS)
            .field("y", FLOATS)
            .field("extrap", INT),
        CardSchema::generic("TABLES1")
            .field("tid", REF)
            .field("table_type", INT)
            .field("x", FLOATS)
            .field("y", FLOATS),
        CardSchema::generic("TABLEM1")
            .field("tid", REF)
            .field("xaxis", STR)
            .field("yaxis", STR)
            .field("x", FLOATS)
            .field("y", FLOATS)
            .field("extrap", INT),
        CardSchema::generic("TSTEP")
            .field("sid", REF)
            .field("n", INTS)
            .field("dt", FLOATS)
            .field("no", INTS),
        CardSchema::columnar("TSTEPNL")
            .field("sid", REF)
            .field("ndt", INT)
            .field("dt", FLOAT)
            .field("no", INT)
            .field("method", STR)
            .optional("kstep", INT)
            .field("max_iter", INT)
            .field("conv", STR),
        CardSchema::columnar("NLPARM")
            .field("nlparm_id", REF)
            .field("ninc", INT)
            .field("dt", FLOAT)
            .field("kmethod", STR)
            .field("kstep", INT)
            .field("max_iter", INT)
            .field("conv", STR)
            .field("int_out", STR)
            .field("eps", floats(3))
            .field("max_bisect", INT)
            .optional("max_div", INT)
            .optional("max_qn", INT)
            .optional("max_ls", INT)
            .field("fstress", FLOAT),
        CardSchema::generic("NLPCI")
            .field("nlpci_id", REF)
            .field("nlpci_type", STR)
            .field("minalr", FLOAT)
            .field("maxalr", FLOAT)
            .field("scale", FLOAT)
            .field("desiter", INT)
            .field("mxinc", INT),
        // optimization
        CardSchema::columnar("DESVAR")
            .field("desvar_id", REF)
            .field("label", STR)
            .field("xinit", FLOAT)
            .field("xlb", FLOAT)
            .field("xub", FLOAT)
            .optional("delx", FLOAT)
            .optional("ddval", REF),
        CardSchema::generic("DDVAL").field("oid", REF).field("ddvals", FLOATS),
        CardSchema::generic("DLINK")
            .field("oid", REF)
            .field("dependent_desvar", REF)
            .field("c0", FLOAT)
            .field("cmult", FLOAT)
            .field("independent_desvars", INTS)
            .field("coeffs", FLOATS),
        CardSchema::generic("DRESP1")
            .field("dresp_id", REF)
            .field("label", STR)
            .field("response_type", STR)
            .optional("property_type", STR)
            .optional("region", INT)
            .optional("atta", ANY)
            .optional("attb", ANY)
            .field("atti", ANYS)
            .on_finalize(clear_legacy_region),
        CardSchema::generic("DRESP2")
            .field("dresp_id", REF)
            .field("label", STR)
            .field("dequation", REF)
            .optional("region", INT)
            .field("method", STR)
            .field("c1", FLOAT)
            .field("c2", FLOAT)
            .field("c3", FLOAT)
            .field("param_labels", STRS)
            .field("param_ids", INTS)
            .on_finalize(clear_legacy_region),
        CardSchema::columnar("DCONSTR")
            .field("oid", REF)
            .field("dresp_id", REF)
            .field("lid", FLOAT)
            .field("uid", FLOAT)
            .field("lowfq", FLOAT)
            .field("highfq", FLOAT),
        CardSchema::generic("DCONADD").field("oid", REF).field("dconstrs", INTS),
        CardSchema::generic("DVPREL1")
            .field("oid", REF)
            .field("prop_type", STR)
            .field("pid", REF)
            .field("pname_fid", ANY)
            .optional("p_min", FLOAT)
            .field("p_max", FLOAT)
            .field("c0", FLOAT)
            .field("desvar_ids", INTS)
            .field("coeffs", FLOATS),
        relation("DVCREL1", "element", "cp_name"),
        relation("DVMREL1", "mat", "mp_name"),
        CardSchema::columnar("DVGRID")
            .field("dvid", REF)
            .field("nid", REF)
            .optional("cid", REF)
            .field("coeff", FLOAT)
            .field("dxyz", floats(3)),
        // aero
        CardSchema::columnar("CAERO1")
            .field("eid", REF)
            .field("pid", REF)
            .optional("cp", REF)
            .optional("nspan", INT)
            .optional("nchord", INT)
            .optional("lspan", REF)
            .optional("lchord", REF)
            .field("igroup", INT)
            .field("p1", floats(3))
            .field("x12", FLOAT)
            .field("p4", floats(3))
            .field("x43", FLOAT),
        CardSchema::generic("SPLINE1")
            .field("eid", REF)
            .field("caero", REF)
            .field("box1", INT)
            .field("box2", INT)
            .field("setg", REF)
            .field("dz", FLOAT)
            .field("method", STR)
            .field("usage", STR)
            .field("nelements", INT)
            .field("melements", INT),
        CardSchema::generic("AESURF")
            .field("aesurf_id", REF)
            .field("label", STR)
            .field("cid1", REF)
            .field("aelist_id1", REF)
            .optional("cid2", REF)
            .optional("aelist_id2", REF)
            .field("eff", FLOAT)
            .field("ldw", STR)
            .field("crefc", FLOAT)
            .field("crefs", FLOAT)
            .field("pllim", FLOAT)
            .field("pulim", FLOAT)
            .optional("hmllim", FLOAT)
            .optional("hmulim", FLOAT)
            .optional("tqllim", REF)
            .optional("tqulim", REF),
        CardSchema::generic("AELIST").field("sid", REF).field("elements", INTS),
        CardSchema::generic("AESTAT").field("aestat_id", REF).field("label", STR),
        CardSchema::generic("AECOMP")
            .field("name", STR)
            .field("list_type", STR)
            .field("lists", INTS),
        CardSchema::generic("AEFACT").field("sid", REF).field("fractions", FLOATS),
        CardSchema::generic("AEPARM")
            .field("aeparm_id", REF)
            .field("label", STR)
            .field("units", STR),

        CardSchema::generic("AELINK")
            .field("aelink_id", INT)
            .field("label", STR)
            .field("independent_labels", STRS)
            .field("linking_coefficients", FLOATS),
        CardSchema::generic("MKAERO1")
            .field("machs", FLOATS)
            .field("reduced_freqs", FLOATS),
        CardSchema::generic("MONPNT1")
            .field("name", STR)
            .field("label", STR)
            .field("axes", STR)
            .field("aecomp_name", STR)
            .field("xyz", floats(3))
            .optional("cp", REF)
            .optional("cd", REF),
        CardSchema::generic("AERO")
            .field("acsid", REF)
            .optional("velocity", FLOAT)
            .field("cref", FLOAT)
            .field("rho_ref", FLOAT)
            .field("sym_xz", INT)
            .field("sym_xy", INT),
        CardSchema::generic("AEROS")
            .field("acsid", REF)
            .field("rcsid", REF)
            .field("cref", FLOAT)
            .field("bref", FLOAT)
            .field("sref", FLOAT)
            .field("sym_xz", INT)
            .field("sym_xy", INT),
        CardSchema::generic("CSSCHD")
            .field("sid", REF)
            .field("aesid", REF)
            .optional("lschd", REF)
            .optional("lalpha", REF)
            .optional("lmach", REF),
        CardSchema::generic("FLFACT").field("sid", REF).field("factors", FLOATS),
        CardSchema::generic("TRIM")
            .field("sid", REF)
            .field("mach", FLOAT)
            .field("q", FLOAT)
            .field("labels", STRS)
            .field("uxs", FLOATS)
            .field("aeqr", FLOAT),
        CardSchema::generic("FLUTTER")
            .field("sid", REF)
            .field("method", STR)
            .field("density", REF)
            .field("mach", REF)
            .field("reduced_freq_velocity", REF)
            .field("imethod", STR)
            .optional("nvalue", INT)
            .optional("omax", FLOAT)
            .field("epsilon", FLOAT),
        CardSchema::columnar("GUST")
            .field("sid", REF)
            .field("dload", REF)
            .field("wg", FLOAT)
            .field("x0", FLOAT)
            .optional("v", FLOAT),
        CardSchema::generic("DIVERG")
            .field("sid", REF)
            .field("nroots", INT)
            .field("machs", FLOATS),
        // plotting and sets
        CardSchema::columnar("PLOTEL").field("eid", REF).field("nodes", ints(2)),
        CardSchema::generic("SET1")
            .field("sid", REF)
            .field("ids", INTS)
            .field("is_skin", BOOL),
        // tables
        CardSchema::generic("PARAM").field("key", STR).field("values", ANYS),
        CardSchema::generic("USET")
            .field("name", STR)
            .field("components", STRS)
            .field("ids", INTS),
        CardSchema::generic("USET1")
            .field("name", STR)
            .field("components", STR)
            .field("ids", INTS),
        // matrices
        dmig("DMIG"),
        dmig("DMIJ"),
        dmig("DMIJI"),
        dmig("DMIK"),
        CardSchema::generic("DMI")
            .field("name", STR)
            .field("form", INT)
            .field("tin", INT)
            .field("tout", INT)
            .field("nrows", INT)
            .field("ncols", INT)
            .field("gcj", INTS)
            .field("gci", INTS)
            .field("real", FLOATS)
            .optional("complex", FLOATS)
            .field("is_complex", BOOL)
            .skip("is_complex")
            .on_finalize(derive_matrix_flags),
        // positional sets
        CardSchema::generic("ASET")
            .field("ids", INTS)
            .field("components", STRS),
        set1("ASET1"),
        set1("BSET1"),
        set1("CSET1"),
        set1("QSET1"),
        set1("OMIT1"),
        CardSchema::generic("SUPORT")
            .field("nodes", INTS)
            .field("components", STRS),
        se_set1("SEBSET1"),
        se_set1("SECSET1"),
        se_set1("SEQSET1"),
        CardSchema::generic("SESUP")
            .field("seid", INT)
            .field("nodes", INTS)
            .field("components", STRS),
        // singletons
        CardSchema::generic("AXIC").field("nharmonics", INT),
        CardSchema::generic("AXIF")
            .field("cid", REF)
            .field("g", FLOAT)
            .field("drho", FLOAT)
            .field("db", FLOAT)
            .optional("no_hsb", STR)
            .field("harmonics", INTS),
        orientation("BAROR"),
        orientation("BEAMOR"),
        CardSchema::generic("CASE_CONTROL_DECK").field("lines", STRS),
        CardSchema::generic("DOPTPRM").field("params", ANY_MAP),
        CardSchema::generic("DTABLE").field("default_values", ANY_MAP),
        CardSchema::generic("GRDSET")
            .optional("cp", REF)
            .optional("cd", REF)
            .optional("ps", STR)
            .optional("seid", INT),
        CardSchema::generic("RADSET").field("cavities", INTS),
        CardSchema::generic("SEQGP")
            .field("nids", INTS)
            .field("seqids", ANYS),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schema::Layout;

    #[test]
    fn builtin_registry_is_valid() {
        let registry = registry().unwrap();
        assert!(registry.len() > 110);
        assert_eq!(registry.resolve("DVGRID").unwrap().layout(), Layout::Columnar);
        assert_eq!(registry.resolve("GRID").unwrap().layout(), Layout::Columnar);
        assert_eq!(registry.resolve("CBEAM").unwrap().layout(), Layout::Generic);
    }

    #[test]
    fn legacy_reference_sentinel_becomes_unset() {
        let registry = registry().unwrap();
        let schema = registry.resolve("MAT1").unwrap();
        let mut mat = schema.construct().with("mid", 1).with("mcsid", -1);
        schema.finalize(&mut mat);
        assert!(!mat.is_set("mcsid"));
        assert_eq!(mat.int("mid"), Some(1));
    }

    #[test]
    fn matrix_flags_are_derived_from_input_type() {
        let registry = registry().unwrap();
        let schema = registry.resolve("DMIG").unwrap();
        let mut real = schema.construct().with("tin", 1);
        let mut complex = schema.construct().with("tin", 3);
        schema.finalize(&mut real);
        schema.finalize(&mut complex);
        assert_eq!(real.get("is_complex"), Some(&Value::bool(false)));
        assert_eq!(complex.get("is_complex"), Some(&Value::bool(true)));
    }
}
