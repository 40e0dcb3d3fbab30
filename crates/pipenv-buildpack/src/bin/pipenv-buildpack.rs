use libcnb::buildpack_main;
use pipenv_buildpack::PipenvBuildpack;

buildpack_main!(PipenvBuildpack);
